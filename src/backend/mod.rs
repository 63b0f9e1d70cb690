pub mod memory;
pub mod null;

pub use memory::MemorySearchBackend;
pub use null::NullSearchBackend;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Metadata;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("search backend failure: {0}")]
    Failed(String),
}

impl BackendError {
    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Failed(message.into())
    }
}

/// A raw search result as the backend returned it, prior to normalization.
///
/// Every field is optional; [`Document::from_hit`](crate::document::Document::from_hit)
/// fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>) -> Self {
        SearchHit {
            content: Some(content.into()),
            ..SearchHit::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Retrieves candidate documents for a query.
///
/// Failures propagate to the caller uncaught; the pipeline performs no
/// retries.
pub trait SearchBackend: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError>;
}
