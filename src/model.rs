use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::DISCOUNT_LOOKAHEAD_MONTHS;

/// Calendar date range, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Nights between check-in and check-out. Negative for inverted ranges.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// A bookable range must end strictly after it starts.
    pub fn is_bookable(&self) -> bool {
        self.start < self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// One contiguous window of availability with its nightly price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub nightly_price: Decimal,
    #[serde(default)]
    pub promotion_price: Option<Decimal>,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate, nightly_price: Decimal) -> Self {
        Self {
            start,
            end,
            nightly_price,
            promotion_price: None,
        }
    }

    pub fn with_promotion(mut self, price: Decimal) -> Self {
        self.promotion_price = Some(price);
        self
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// Days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True iff `range` lies entirely inside this period.
    pub fn contains(&self, range: &DateRange) -> bool {
        range.start >= self.start && range.end <= self.end
    }

    /// Split off `range`, returning what is left (zero, one or two periods).
    /// Caller must have checked `contains(range)`.
    pub fn subtract(&self, range: &DateRange) -> Vec<Period> {
        debug_assert!(self.contains(range), "subtract range must lie inside the period");
        let mut rest = Vec::with_capacity(2);
        if range.start > self.start
            && let Some(end) = range.start.pred_opt()
        {
            rest.push(self.remainder(self.start, end));
        }
        if range.end < self.end
            && let Some(start) = range.end.succ_opt()
        {
            rest.push(self.remainder(start, self.end));
        }
        rest
    }

    fn remainder(&self, start: NaiveDate, end: NaiveDate) -> Period {
        Period {
            start,
            end,
            nightly_price: self.nightly_price,
            promotion_price: self.promotion_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// A listed house. `version` is bumped by the gateway on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    pub id: Ulid,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: Address,
    pub available_periods: Vec<Period>,
    #[serde(default)]
    pub version: u64,
}

/// House contents as supplied by an owner, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHouse {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: Address,
    #[serde(default)]
    pub available_periods: Vec<Period>,
}

impl NewHouse {
    pub fn into_house(self, id: Ulid) -> House {
        House {
            id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            address: self.address,
            available_periods: self.available_periods,
            version: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Ulid,
    pub house_id: Ulid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: Decimal,
}

impl Rental {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Replacement contents for an existing rental. Stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalUpdate {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: Decimal,
}

// ── Discovery filters ───────────────────────────────────────────

/// Structured predicate over persisted houses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HouseFilter {
    Owner(String),
    City(String),
    /// City match plus at least one period *starting* inside `[from, to]`.
    CityAndPeriod {
        city: String,
        from: NaiveDate,
        to: NaiveDate,
    },
    /// A promoted period starting within the lookahead window after `today`.
    DiscountedSoon { today: NaiveDate },
}

impl HouseFilter {
    pub fn discounted_soon(today: NaiveDate) -> Self {
        HouseFilter::DiscountedSoon { today }
    }

    pub fn matches(&self, house: &House) -> bool {
        match self {
            HouseFilter::Owner(owner) => house.owner_id == *owner,
            HouseFilter::City(city) => house.address.city == *city,
            HouseFilter::CityAndPeriod { city, from, to } => {
                house.address.city == *city
                    && house
                        .available_periods
                        .iter()
                        .any(|p| p.start >= *from && p.start <= *to)
            }
            HouseFilter::DiscountedSoon { today } => {
                let horizon = today
                    .checked_add_months(Months::new(DISCOUNT_LOOKAHEAD_MONTHS))
                    .unwrap_or(NaiveDate::MAX);
                house.available_periods.iter().any(|p| {
                    p.promotion_price.is_some() && p.start >= *today && p.start <= horizon
                })
            }
        }
    }
}

// ── Log records ─────────────────────────────────────────────────

/// Gateway mutations as written to the WAL. Full records, last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    HousePut(House),
    /// Carries the last version so numbering continues if the id is reused.
    HouseDeleted { id: Ulid, version: u64 },
    RentalPut(Rental),
    RentalDeleted { id: Ulid },
}
