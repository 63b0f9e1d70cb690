use std::fmt;

use sha2::{Digest, Sha256};

use crate::config::ContextConfig;
use crate::document::Metadata;

/// Stable cache key over everything that can change the encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for one assembly run.
    ///
    /// Hashes the query, the caller metadata, and the selection-relevant
    /// config fields as tagged lines. Both maps iterate in sorted order,
    /// so identical inputs always produce identical keys.
    pub fn derive(query: &str, metadata: &Metadata, config: &ContextConfig) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(b"query=");
        hasher.update(query.as_bytes());
        hasher.update(b"\n");

        for (key, value) in metadata.iter() {
            hasher.update(b"meta:");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update(b"\n");
        }

        hasher.update(format!("limit={}\n", config.limit).as_bytes());
        hasher.update(format!("search_limit={}\n", config.search_limit).as_bytes());
        hasher.update(format!("max_tokens={}\n", config.max_tokens).as_bytes());
        hasher.update(format!("min_score={}\n", config.min_score).as_bytes());

        for (key, spec) in config.metadata_filters.iter() {
            hasher.update(format!("filter:{}={}\n", key, spec.fingerprint()).as_bytes());
        }

        let digest = hasher.finalize();
        CacheKey(format!("rag:{}", hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
