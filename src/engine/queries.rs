use chrono::{NaiveDate, Utc};
use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn present(param: Option<&str>) -> Option<&str> {
    param.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| EngineError::InvalidQuery("dates must be YYYY-MM-DD"))
}

impl HouseFilter {
    /// Pick a filter from listing query parameters. Blank counts as absent.
    /// Precedence: owner, then city with both dates, then city alone.
    pub fn from_params(
        user_id: Option<&str>,
        city: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HouseFilter, EngineError> {
        if let Some(owner) = present(user_id) {
            return Ok(HouseFilter::Owner(owner.to_string()));
        }
        match (present(city), present(start_date), present(end_date)) {
            (Some(city), Some(from), Some(to)) => Ok(HouseFilter::CityAndPeriod {
                city: city.to_string(),
                from: parse_date(from)?,
                to: parse_date(to)?,
            }),
            (Some(city), _, _) => Ok(HouseFilter::City(city.to_string())),
            _ => Err(EngineError::InvalidQuery("expected user-id, or city with optional start-date and end-date")),
        }
    }
}

impl Engine {
    /// Read-only discovery. Served from the gateway, never the fast store.
    pub async fn find_houses(&self, filter: &HouseFilter) -> Result<Vec<House>, EngineError> {
        Ok(self.gateway.query_houses(filter).await?)
    }

    pub async fn discounted_soon(&self) -> Result<Vec<House>, EngineError> {
        let today = Utc::now().date_naive();
        self.find_houses(&HouseFilter::discounted_soon(today)).await
    }

    /// A rental of this house. Rentals of other houses are `NotFound`.
    pub async fn get_rental(&self, house_id: Ulid, rental_id: Ulid) -> Result<Rental, EngineError> {
        self.gateway
            .get_rental(rental_id)
            .await?
            .filter(|r| r.house_id == house_id)
            .ok_or(EngineError::NotFound(rental_id))
    }

    pub async fn list_rentals(&self, house_id: Ulid) -> Result<Vec<Rental>, EngineError> {
        Ok(self.gateway.rentals_for_house(house_id).await?)
    }
}
