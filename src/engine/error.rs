use chrono::NaiveDate;
use ulid::Ulid;

use crate::gateway::GatewayError;
use crate::model::DateRange;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    InvalidHouse(String),
    InvalidQuery(&'static str),
    /// No period of the house contains the requested range. A normal rejection.
    NoAvailability(DateRange),
    /// The house changed between read and write. Safe to retry.
    Conflict(Ulid),
    Persistence(String),
    /// The house write landed but the rental write did not.
    PartialBookingWrite {
        house_id: Ulid,
        rental_id: Ulid,
        rolled_back: bool,
        cause: String,
    },
    LimitExceeded(&'static str),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::NoAvailability(_))
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::InvalidHouse(_) => "invalid_house",
            EngineError::InvalidQuery(_) => "invalid_query",
            EngineError::NoAvailability(_) => "no_availability",
            EngineError::Conflict(_) => "conflict",
            EngineError::Persistence(_) => "persistence",
            EngineError::PartialBookingWrite { .. } => "partial_write",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid range: start {start} must be before end {end}")
            }
            EngineError::InvalidHouse(msg) => write!(f, "invalid house: {msg}"),
            EngineError::InvalidQuery(msg) => write!(f, "invalid query: {msg}"),
            EngineError::NoAvailability(range) => {
                write!(f, "no available period contains {range}")
            }
            EngineError::Conflict(id) => {
                write!(f, "house {id} was modified concurrently; retry")
            }
            EngineError::Persistence(e) => write!(f, "persistence error: {e}"),
            EngineError::PartialBookingWrite {
                house_id,
                rental_id,
                rolled_back,
                cause,
            } => {
                let state = if *rolled_back {
                    "availability restored"
                } else {
                    "availability NOT restored, manual repair needed"
                };
                write!(
                    f,
                    "rental {rental_id} for house {house_id} not written ({cause}); {state}"
                )
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<GatewayError> for EngineError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Conflict { id, .. } => EngineError::Conflict(id),
            other => EngineError::Persistence(other.to_string()),
        }
    }
}
