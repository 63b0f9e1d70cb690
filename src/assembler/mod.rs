use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::backend::{BackendError, SearchBackend};
use crate::cache::{CacheKey, CacheStore};
use crate::config::ContextConfig;
use crate::document::{Document, Metadata};
use crate::encoding::{EncodeError, Encoder};
use crate::metrics::{MetricEvent, MetricsSink};
use crate::selection::{
    ApproxTokenCounter, DocumentSelector, SelectedDocument, Summarizer, SummarizerRegistry,
    TokenCounter,
};

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("search failed: {0}")]
    Backend(#[from] BackendError),
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Orchestrates one context-assembly run: cache probe, retrieval,
/// filtering, budgeted selection, encoding, and side effects.
///
/// All collaborators are injected at construction; there is no lazy
/// resolution and no internal retry. Cache and metrics failures are logged
/// and discarded, backend and encoder failures propagate.
pub struct ContextAssembler<T = ApproxTokenCounter> {
    backend: Arc<dyn SearchBackend>,
    encoder: Arc<dyn Encoder>,
    cache: Option<Arc<dyn CacheStore>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    config: ContextConfig,
    tokenizer: T,
    selector: DocumentSelector<T>,
}

impl ContextAssembler<ApproxTokenCounter> {
    pub fn new(backend: Arc<dyn SearchBackend>, encoder: Arc<dyn Encoder>) -> Self {
        Self::with_token_counter(backend, encoder, ApproxTokenCounter)
    }
}

impl<T> ContextAssembler<T>
where
    T: TokenCounter + Clone,
{
    /// Build an assembler around a custom token estimator. The selector
    /// shares the same estimator so query and document counts agree.
    pub fn with_token_counter(
        backend: Arc<dyn SearchBackend>,
        encoder: Arc<dyn Encoder>,
        tokenizer: T,
    ) -> Self {
        let selector = DocumentSelector::new(tokenizer.clone(), Summarizer::default());
        Self {
            backend,
            encoder,
            cache: None,
            metrics: None,
            config: ContextConfig::default(),
            tokenizer,
            selector,
        }
    }
}

impl<T> ContextAssembler<T>
where
    T: TokenCounter,
{
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_summarizers(mut self, registry: SummarizerRegistry) -> Self {
        self.selector = self.selector.with_summarizer(Summarizer::new(registry));
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Assemble the encoded context payload for a query.
    ///
    /// The payload is the caller metadata merged with `query` and the
    /// selected `documents`. With a positive `cache_ttl`, a cache hit
    /// short-circuits the run and the backend is never consulted.
    pub fn build_context(
        &self,
        query: &str,
        metadata: &Metadata,
    ) -> Result<String, AssembleError> {
        let config = &self.config;
        let cache_key = CacheKey::derive(query, metadata, config);

        if config.cache_ttl > 0 {
            if let Some(cached) = self.cached_payload(&cache_key) {
                self.record_metric(
                    MetricEvent::new("rag_search")
                        .with("query", query)
                        .with("cache_hit", true),
                );
                return Ok(cached);
            }
        }

        let start = Instant::now();

        let hits = self.backend.search(query, config.search_limit)?;
        let candidates = hits.into_iter().map(Document::from_hit).collect();
        let candidates = apply_filters(candidates, config);

        let query_tokens = self.tokenizer.count_tokens(query);
        let selection = self.selector.select(candidates, config, query_tokens);

        let payload = build_payload(metadata, query, &selection.documents)?;
        let encoded = self.encoder.encode(&payload)?;

        let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;
        self.record_metric(
            MetricEvent::new("rag_search")
                .with("query", query)
                .with("document_count", selection.documents.len() as u64)
                .with("total_tokens", selection.total_tokens as u64)
                .with("query_tokens", query_tokens as u64)
                .with("latency_ms", latency_ms)
                .with("cache_hit", false),
        );

        if config.cache_ttl > 0 {
            self.store_payload(&cache_key, &encoded, config.cache_ttl);
        }

        Ok(encoded)
    }

    fn cached_payload(&self, key: &CacheKey) -> Option<String> {
        let store = self.cache.as_deref()?;
        match store.has(key) {
            Ok(true) => match store.get(key) {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "cache read failed");
                    None
                }
            },
            Ok(false) => None,
            Err(err) => {
                warn!(error = %err, "cache probe failed");
                None
            }
        }
    }

    fn store_payload(&self, key: &CacheKey, encoded: &str, ttl_seconds: u64) {
        let Some(store) = self.cache.as_deref() else {
            return;
        };
        if let Err(err) = store.put(key, encoded, ttl_seconds) {
            warn!(error = %err, "cache write failed");
        }
    }

    fn record_metric(&self, event: MetricEvent) {
        let Some(sink) = self.metrics.as_deref() else {
            return;
        };
        if let Err(err) = sink.record(&event) {
            warn!(error = %err, "metrics sink failed");
        }
    }
}

/// Drop candidates below the score floor or failing a metadata filter,
/// then sort survivors by score descending. The sort is stable, so
/// backend order is preserved among equal scores.
fn apply_filters(candidates: Vec<Document>, config: &ContextConfig) -> Vec<Document> {
    let filters = &config.metadata_filters;
    let mut kept: Vec<Document> = candidates
        .into_iter()
        .filter(|doc| doc.score >= config.min_score)
        .filter(|doc| filters.is_empty() || filters.matches(&doc.metadata))
        .collect();

    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    kept
}

/// Caller metadata merged with the query and the selected documents; the
/// reserved keys win on collision.
fn build_payload(
    metadata: &Metadata,
    query: &str,
    documents: &[SelectedDocument],
) -> Result<Value, EncodeError> {
    let mut payload = Map::new();
    for (key, value) in metadata.iter() {
        payload.insert(key.clone(), value.clone());
    }
    payload.insert("query".to_string(), Value::String(query.to_string()));
    payload.insert("documents".to_string(), serde_json::to_value(documents)?);
    Ok(Value::Object(payload))
}
