pub mod key;
pub mod memory;

pub use key::CacheKey;
pub use memory::MemoryCacheStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store failure: {0}")]
    Store(String),
}

impl CacheError {
    pub fn store(message: impl Into<String>) -> Self {
        CacheError::Store(message.into())
    }
}

/// TTL-bound store for encoded payloads.
///
/// The store owns atomicity and eviction; the assembler treats every
/// failure here as a suppressed side-channel error.
pub trait CacheStore: Send + Sync {
    fn has(&self, key: &CacheKey) -> Result<bool, CacheError>;
    fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;
    fn put(&self, key: &CacheKey, value: &str, ttl_seconds: u64) -> Result<(), CacheError>;
}
