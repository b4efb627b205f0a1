use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{apply_booking, validate_periods};
use super::{Engine, EngineError};

fn validate_new_house(house: &NewHouse) -> Result<(), EngineError> {
    if house.owner_id.trim().is_empty() {
        return Err(EngineError::InvalidHouse("owner id is required".into()));
    }
    if house.address.city.trim().is_empty() {
        return Err(EngineError::InvalidHouse("city is required".into()));
    }
    if house.owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(EngineError::LimitExceeded("owner id too long"));
    }
    if house.name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("house name too long"));
    }
    if let Some(desc) = &house.description
        && desc.len() > MAX_DESCRIPTION_LEN
    {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    validate_periods(&house.available_periods)
}

fn validate_booking(range: &DateRange) -> Result<(), EngineError> {
    if !range.is_bookable() {
        return Err(EngineError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.nights() > MAX_BOOKING_NIGHTS {
        return Err(EngineError::LimitExceeded("booking too long"));
    }
    Ok(())
}

impl Engine {
    pub async fn create_house(&self, house: NewHouse) -> Result<House, EngineError> {
        validate_new_house(&house)?;
        let stored = self.gateway.put_house(house.into_house(Ulid::new()), None).await?;
        self.cache_house(&stored).await;
        info!("house {} listed by {}", stored.id, stored.owner_id);
        Ok(stored)
    }

    /// Replace a house wholesale. Creates it if the id is unknown.
    pub async fn update_house(&self, id: Ulid, house: NewHouse) -> Result<House, EngineError> {
        validate_new_house(&house)?;
        let stored = self.gateway.put_house(house.into_house(id), None).await?;
        self.cache_house(&stored).await;
        info!("house {id} replaced (version {})", stored.version);
        Ok(stored)
    }

    pub async fn delete_house(&self, id: Ulid) -> Result<(), EngineError> {
        let deleted = self.gateway.delete_house(id).await?;
        self.evict_house(id).await;
        if !deleted {
            return Err(EngineError::NotFound(id));
        }
        info!("house {id} deleted");
        Ok(())
    }

    /// Book `range` on a house: consume availability, price it, record a rental.
    pub async fn book(&self, house_id: Ulid, range: DateRange) -> Result<Rental, EngineError> {
        let started = Instant::now();
        let result = self.book_inner(house_id, range).await;
        let outcome = match &result {
            Ok(_) => "accepted",
            Err(e) => e.label(),
        };
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "outcome" => outcome).increment(1);
        metrics::histogram!(crate::observability::BOOKING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn book_inner(&self, house_id: Ulid, range: DateRange) -> Result<Rental, EngineError> {
        let house = self.get_house(house_id).await?;
        validate_booking(&range)?;

        let (periods, consumed) = match apply_booking(&house.available_periods, &range) {
            Ok(split) => split,
            Err(e) => {
                debug!("booking {range} on house {house_id} rejected: {e}");
                return Err(e);
            }
        };
        // Promotion prices are advertised, never charged.
        let price = Decimal::from(range.nights()) * consumed.nightly_price;

        let read_version = house.version;
        let mut updated = house.clone();
        updated.available_periods = periods;
        let written = match self.gateway.put_house(updated, Some(read_version)).await {
            Ok(h) => h,
            Err(e) => {
                let err = EngineError::from(e);
                if err.is_retryable() {
                    warn!("booking {range} on house {house_id} lost a version race at {read_version}");
                    self.evict_house(house_id).await;
                }
                return Err(err);
            }
        };
        self.cache_house(&written).await;

        let rental = Rental {
            id: Ulid::new(),
            house_id,
            start_date: range.start,
            end_date: range.end,
            price,
        };
        match self.gateway.put_rental(rental.clone()).await {
            Ok(stored) => {
                info!(
                    "rental {} booked on house {house_id} for {range} at {price}",
                    stored.id
                );
                Ok(stored)
            }
            Err(e) => Err(self.compensate(house, written.version, rental.id, e.to_string()).await),
        }
    }

    /// Undo the availability write of a booking whose rental could not be stored.
    async fn compensate(&self, original: House, written_version: u64, rental_id: Ulid, cause: String) -> EngineError {
        let house_id = original.id;
        let rolled_back = match self.gateway.put_house(original, Some(written_version)).await {
            Ok(restored) => {
                self.cache_house(&restored).await;
                true
            }
            Err(e) => {
                self.evict_house(house_id).await;
                error!("rollback of house {house_id} after failed rental {rental_id} failed: {e}");
                false
            }
        };
        error!("rental {rental_id} on house {house_id} not stored: {cause} (rolled back: {rolled_back})");
        EngineError::PartialBookingWrite {
            house_id,
            rental_id,
            rolled_back,
            cause,
        }
    }

    /// Overwrite a rental's dates and price. No availability is recomputed.
    /// A rental filed under another house is `NotFound`; an unknown id is stored.
    pub async fn update_rental(
        &self,
        house_id: Ulid,
        rental_id: Ulid,
        update: RentalUpdate,
    ) -> Result<Rental, EngineError> {
        if let Some(existing) = self.gateway.get_rental(rental_id).await?
            && existing.house_id != house_id
        {
            return Err(EngineError::NotFound(rental_id));
        }
        let rental = Rental {
            id: rental_id,
            house_id,
            start_date: update.start_date,
            end_date: update.end_date,
            price: update.price,
        };
        let stored = self.gateway.put_rental(rental).await?;
        debug!("rental {rental_id} on house {house_id} overwritten");
        Ok(stored)
    }

    /// Remove a rental record. Availability is not given back.
    pub async fn delete_rental(&self, house_id: Ulid, rental_id: Ulid) -> Result<(), EngineError> {
        self.get_rental(house_id, rental_id).await?;
        if !self.gateway.delete_rental(rental_id).await? {
            return Err(EngineError::NotFound(rental_id));
        }
        info!("rental {rental_id} on house {house_id} deleted");
        Ok(())
    }
}
