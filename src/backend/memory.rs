use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use super::{BackendError, SearchBackend, SearchHit};
use crate::document::Metadata;

#[derive(Debug, Clone)]
struct StoredDocument {
    content: String,
    metadata: Metadata,
    score: f64,
}

/// In-memory search backend with naive substring relevance.
///
/// Does not implement real vector similarity; it provides a predictable
/// dataset for tests and local development. A numeric `score` metadata key
/// sets the base relevance (default 1.0), and a case-insensitive substring
/// match with the query adds 0.5 on top.
#[derive(Debug, Default)]
pub struct MemorySearchBackend {
    index: RwLock<BTreeMap<String, StoredDocument>>,
}

impl MemorySearchBackend {
    pub fn new() -> Self {
        MemorySearchBackend::default()
    }

    pub fn store(&self, id: impl Into<String>, content: impl Into<String>, metadata: Metadata) {
        let score = metadata
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        let entry = StoredDocument {
            content: content.into(),
            metadata,
            score,
        };
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), entry);
    }

    pub fn delete(&self, id: &str) {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SearchBackend for MemorySearchBackend {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        let query = query.trim().to_lowercase();
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits: Vec<SearchHit> = index
            .iter()
            .map(|(id, doc)| {
                let mut score = doc.score;
                if !query.is_empty() && doc.content.to_lowercase().contains(&query) {
                    score += 0.5;
                }
                SearchHit {
                    id: Some(id.clone()),
                    content: Some(doc.content.clone()),
                    score: Some(score),
                    metadata: Some(doc.metadata.clone()),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            let left = b.score.unwrap_or(0.0);
            let right = a.score.unwrap_or(0.0);
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }
}
