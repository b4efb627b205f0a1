mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{apply_booking, find_satisfying, is_disjoint, total_days, validate_periods};
pub use error::EngineError;

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::cache::{house_key, FastStore};
use crate::gateway::Gateway;
use crate::model::House;

/// Booking and discovery over a durable gateway with a fast store in front.
///
/// Holds no per-request state; every call loads what it needs and writes it back.
pub struct Engine {
    gateway: Arc<dyn Gateway>,
    cache: Arc<dyn FastStore>,
}

impl Engine {
    pub fn new(gateway: Arc<dyn Gateway>, cache: Arc<dyn FastStore>) -> Self {
        Self { gateway, cache }
    }

    /// Cache-aside read. A hit is served as-is, stale or not. Any cache
    /// problem just sends the read to the gateway.
    pub async fn get_house(&self, id: Ulid) -> Result<House, EngineError> {
        let key = house_key(id);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<House>(&bytes) {
                Ok(house) => {
                    metrics::counter!(crate::observability::CACHE_HITS_TOTAL).increment(1);
                    return Ok(house);
                }
                Err(e) => debug!("undecodable cache entry {key}: {e}"),
            },
            Ok(None) => {}
            Err(e) => debug!("fast store read failed for {key}: {e}"),
        }
        metrics::counter!(crate::observability::CACHE_MISSES_TOTAL).increment(1);

        let house = self
            .gateway
            .get_house(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        self.cache_house(&house).await;
        Ok(house)
    }

    /// Best-effort overwrite of the cached copy.
    pub(super) async fn cache_house(&self, house: &House) {
        let key = house_key(house.id);
        let bytes = match serde_json::to_vec(house) {
            Ok(b) => Bytes::from(b),
            Err(e) => {
                warn!("cannot encode house {} for cache: {e}", house.id);
                return;
            }
        };
        if let Err(e) = self.cache.set(&key, bytes).await {
            warn!("fast store write failed for {key}: {e}");
        }
    }

    pub(super) async fn evict_house(&self, id: Ulid) {
        let key = house_key(id);
        if let Err(e) = self.cache.remove(&key).await {
            warn!("fast store evict failed for {key}: {e}");
        }
    }
}
