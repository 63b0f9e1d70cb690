use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::{CacheError, CacheKey, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expiry| now < expiry)
    }
}

/// In-memory TTL cache for encoded payloads. Suits tests and
/// single-process deployments; expired entries are treated as absent and
/// pruned on the next write.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        MemoryCacheStore::default()
    }

    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn has(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let now = Utc::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key.as_str()).is_some_and(|e| e.is_live(now)))
    }

    fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Utc::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(key.as_str())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    /// Store a value. A zero TTL stores the entry without expiry; callers
    /// that want caching disabled simply do not call `put`.
    fn put(&self, key: &CacheKey, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let now = Utc::now();
        let expires_at = if ttl_seconds > 0 {
            Some(now + Duration::seconds(ttl_seconds as i64))
        } else {
            None
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.as_str().to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}
