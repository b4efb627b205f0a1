mod log;

pub use log::LogGateway;

use async_trait::async_trait;
use ulid::Ulid;

use crate::model::{House, HouseFilter, Rental};

#[derive(Debug)]
pub enum GatewayError {
    /// Conditional write rejected: the stored version is not the expected one.
    Conflict {
        id: Ulid,
        expected: u64,
        found: Option<u64>,
    },
    Io(String),
    /// The background log writer is gone.
    Closed,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Conflict { id, expected, found } => match found {
                Some(v) => write!(f, "version conflict on {id}: expected {expected}, found {v}"),
                None => write!(f, "version conflict on {id}: expected {expected}, record missing"),
            },
            GatewayError::Io(e) => write!(f, "I/O error: {e}"),
            GatewayError::Closed => write!(f, "log writer shut down"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Durable store for houses and rentals. Source of truth for the engine.
///
/// Writes are per-record atomic. Nothing spans records: a booking's house
/// and rental writes are two independent calls.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_house(&self, id: Ulid) -> Result<Option<House>, GatewayError>;

    /// Upsert. With `expected_version` set, the write only happens if the
    /// stored house carries exactly that version. Returns the stored record
    /// with its new version.
    async fn put_house(&self, house: House, expected_version: Option<u64>) -> Result<House, GatewayError>;

    /// Returns false if there was nothing to delete.
    async fn delete_house(&self, id: Ulid) -> Result<bool, GatewayError>;

    async fn query_houses(&self, filter: &HouseFilter) -> Result<Vec<House>, GatewayError>;

    async fn get_rental(&self, id: Ulid) -> Result<Option<Rental>, GatewayError>;

    async fn put_rental(&self, rental: Rental) -> Result<Rental, GatewayError>;

    async fn delete_rental(&self, id: Ulid) -> Result<bool, GatewayError>;

    async fn rentals_for_house(&self, house_id: Ulid) -> Result<Vec<Rental>, GatewayError>;
}
