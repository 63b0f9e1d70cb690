use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::Metadata;
use crate::backend::SearchHit;

/// A normalized candidate document, ready for filtering and selection.
///
/// Candidates are ephemeral: built per request from raw backend hits and
/// discarded after the payload is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Metadata,
}

impl Document {
    /// Normalize a raw backend hit.
    ///
    /// Absent ids are generated, absent scores default to 0.0, absent
    /// content and metadata to empty.
    pub fn from_hit(hit: SearchHit) -> Self {
        Document {
            id: hit.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content: hit.content.unwrap_or_default(),
            score: hit.score.unwrap_or(0.0),
            metadata: hit.metadata.unwrap_or_default(),
        }
    }
}
