use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use ulid::Ulid;

#[derive(Debug)]
pub struct CacheError(pub String);

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fast store error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// Key/value cache in front of the gateway. Best-effort: entries may be
/// stale or missing at any time and callers must cope.
#[async_trait]
pub trait FastStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;
    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

pub fn house_key(id: Ulid) -> String {
    format!("house:{id}")
}

/// Process-local fast store. Last writer wins, no expiry.
#[derive(Default)]
pub struct MemoryFastStore {
    entries: DashMap<String, Bytes>,
}

impl MemoryFastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl FastStore for MemoryFastStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
