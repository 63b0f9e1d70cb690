use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::selection::filters::MetadataFilters;
use crate::selection::summarize::SummarizerRef;

pub const DEFAULT_LIMIT: usize = 3;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_MAX_TOKENS: usize = 512;
pub const DEFAULT_MIN_SCORE: f64 = 0.0;
pub const DEFAULT_MAX_SNIPPET: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid context configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Immutable snapshot of the tunables for one assembly run.
///
/// Carries no identity beyond its values; absent keys take their defaults
/// when read from configuration data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of documents returned.
    pub limit: usize,
    /// Candidates requested from the search backend.
    pub search_limit: usize,
    /// Total token budget, query tokens included.
    pub max_tokens: usize,
    /// Relevance floor; lower-scored candidates are dropped.
    pub min_score: f64,
    /// Hard character cap applied to each selected document.
    #[serde(alias = "max_snippet_length")]
    pub max_snippet: usize,
    /// Cache TTL in seconds; zero disables caching.
    pub cache_ttl: u64,
    /// Try summarization before truncation for oversized candidates.
    pub summarize: bool,
    /// Which summarizer to invoke when summarization is enabled.
    #[serde(alias = "summarizer_service")]
    pub summarizer: SummarizerRef,
    /// Admission predicates over candidate metadata.
    pub metadata_filters: MetadataFilters,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            limit: DEFAULT_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_tokens: DEFAULT_MAX_TOKENS,
            min_score: DEFAULT_MIN_SCORE,
            max_snippet: DEFAULT_MAX_SNIPPET,
            cache_ttl: 0,
            summarize: false,
            summarizer: SummarizerRef::None,
            metadata_filters: MetadataFilters::new(),
        }
    }
}

impl ContextConfig {
    /// Read a snapshot from raw configuration data.
    pub fn from_value(source: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(source)?)
    }
}
