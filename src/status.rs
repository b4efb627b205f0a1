//! Status codes and location paths for whatever web layer fronts the engine.

use ulid::Ulid;

use crate::engine::EngineError;

pub const CREATED: u16 = 201;
pub const NO_CONTENT: u16 = 204;

/// Status for a failed operation. Absent records and rejected bookings are
/// "no content", not errors.
pub fn status_for(err: &EngineError) -> u16 {
    match err {
        EngineError::NotFound(_) | EngineError::NoAvailability(_) => NO_CONTENT,
        EngineError::InvalidRange { .. }
        | EngineError::InvalidHouse(_)
        | EngineError::InvalidQuery(_)
        | EngineError::LimitExceeded(_) => 400,
        EngineError::Conflict(_) => 409,
        EngineError::Persistence(_) | EngineError::PartialBookingWrite { .. } => 500,
    }
}

pub fn location_for_house(house_id: Ulid) -> String {
    format!("/rest/house/{house_id}")
}

pub fn location_for_rental(house_id: Ulid, rental_id: Ulid) -> String {
    format!("/rest/house/{house_id}/rental/{rental_id}")
}
