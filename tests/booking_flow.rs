use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use lodgr::cache::MemoryFastStore;
use lodgr::compactor::compact_if_due;
use lodgr::engine::{Engine, EngineError};
use lodgr::gateway::{Gateway, LogGateway};
use lodgr::model::{Address, DateRange, HouseFilter, NewHouse, Period};
use lodgr::status;

// ── Test infrastructure ──────────────────────────────────────

fn data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lodgr_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn open(dir: &PathBuf) -> (Engine, Arc<LogGateway>) {
    let gateway = Arc::new(LogGateway::open(&dir.join("lodgr.wal")).unwrap());
    let engine = Engine::new(gateway.clone(), Arc::new(MemoryFastStore::new()));
    (engine, gateway)
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn house_json(city: &str) -> NewHouse {
    serde_json::from_value(serde_json::json!({
        "ownerId": "owner-7",
        "name": "Old town flat",
        "address": { "street": "Rua Nova 3", "city": city, "country": "PT" },
        "availablePeriods": [
            { "start": "2024-06-01", "end": "2024-06-30", "nightlyPrice": "100" },
            { "start": "2024-07-01", "end": "2024-07-31", "nightlyPrice": "150", "promotionPrice": "120" }
        ]
    }))
    .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────

#[tokio::test]
async fn list_book_and_reopen() {
    let dir = data_dir();
    let (house_id, first, second) = {
        let (engine, _) = open(&dir);
        let house = engine.create_house(house_json("Lisbon")).await.unwrap();
        assert_eq!(status::location_for_house(house.id), format!("/rest/house/{}", house.id));

        let first = engine
            .book(house.id, DateRange::new(d("2024-06-10"), d("2024-06-15")))
            .await
            .unwrap();
        let second = engine
            .book(house.id, DateRange::new(d("2024-07-01"), d("2024-07-08")))
            .await
            .unwrap();
        assert_eq!(first.price, Decimal::from(500));
        assert_eq!(second.price, Decimal::from(7 * 150));

        let err = engine
            .book(house.id, DateRange::new(d("2024-06-14"), d("2024-06-18")))
            .await
            .unwrap_err();
        assert_eq!(status::status_for(&err), status::NO_CONTENT);
        (house.id, first, second)
    };

    let (engine, _) = open(&dir);
    let house = engine.get_house(house_id).await.unwrap();
    assert_eq!(
        house.available_periods.iter().map(Period::range).collect::<Vec<_>>(),
        vec![
            DateRange::new(d("2024-06-01"), d("2024-06-09")),
            DateRange::new(d("2024-06-16"), d("2024-06-30")),
            DateRange::new(d("2024-07-09"), d("2024-07-31")),
        ]
    );
    assert_eq!(engine.list_rentals(house_id).await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn compaction_keeps_state_across_reopen() {
    let dir = data_dir();
    let (house_id, kept) = {
        let (engine, gateway) = open(&dir);
        let house = engine.create_house(house_json("Porto")).await.unwrap();
        let mut kept = None;
        for day in [2, 6, 10, 14, 18] {
            let start = d("2024-06-01") + chrono::Days::new(day);
            let rental = engine
                .book(house.id, DateRange::new(start, start + chrono::Days::new(2)))
                .await
                .unwrap();
            kept = Some(rental);
        }
        let gone = engine.list_rentals(house.id).await.unwrap()[0].id;
        engine.delete_rental(house.id, gone).await.unwrap();

        assert!(compact_if_due(&gateway, 5).await);
        assert_eq!(gateway.appends_since_compact().await, 0);
        (house.id, kept.unwrap())
    };

    let (engine, gateway) = open(&dir);
    let rentals = engine.list_rentals(house_id).await.unwrap();
    assert_eq!(rentals.len(), 4);
    assert_eq!(rentals.last(), Some(&kept));
    let house = gateway.get_house(house_id).await.unwrap().unwrap();
    assert_eq!(house.available_periods.len(), 7);
}

#[tokio::test]
async fn discovery_reflects_deletes() {
    let dir = data_dir();
    let (engine, _) = open(&dir);
    let lisbon = engine.create_house(house_json("Lisbon")).await.unwrap();
    let faro = engine.create_house(house_json("Faro")).await.unwrap();

    let filter = HouseFilter::from_params(None, Some("Faro"), None, None).unwrap();
    assert_eq!(engine.find_houses(&filter).await.unwrap(), vec![faro.clone()]);

    let by_owner = HouseFilter::from_params(Some("owner-7"), Some("Faro"), None, None).unwrap();
    assert_eq!(engine.find_houses(&by_owner).await.unwrap().len(), 2);

    engine.delete_house(faro.id).await.unwrap();
    assert!(engine.find_houses(&filter).await.unwrap().is_empty());
    assert_eq!(engine.find_houses(&by_owner).await.unwrap(), vec![lisbon]);

    let err = engine.get_house(faro.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(status::status_for(&err), status::NO_CONTENT);

    let err = HouseFilter::from_params(None, None, None, None).unwrap_err();
    assert_eq!(status::status_for(&err), 400);
}
