use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use rag_core::assembler::ContextAssembler;
use rag_core::backend::{BackendError, SearchBackend, SearchHit};
use rag_core::cache::{CacheError, CacheKey, CacheStore, MemoryCacheStore};
use rag_core::config::ContextConfig;
use rag_core::document::Metadata;
use rag_core::encoding::JsonEncoder;
use rag_core::metrics::{MetricEvent, MetricsError, MetricsSink};

struct CountingBackend {
    searches: AtomicUsize,
}

impl CountingBackend {
    fn new() -> Self {
        CountingBackend {
            searches: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl SearchBackend for CountingBackend {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SearchHit::new("stable content").with_id("d").with_score(0.9)])
    }
}

struct FailingStore;

impl CacheStore for FailingStore {
    fn has(&self, _key: &CacheKey) -> Result<bool, CacheError> {
        Err(CacheError::store("redis down"))
    }

    fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::store("redis down"))
    }

    fn put(&self, _key: &CacheKey, _value: &str, _ttl: u64) -> Result<(), CacheError> {
        Err(CacheError::store("redis down"))
    }
}

#[derive(Default)]
struct CapturingSink {
    events: Mutex<Vec<MetricEvent>>,
}

impl MetricsSink for CapturingSink {
    fn record(&self, event: &MetricEvent) -> Result<(), MetricsError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn cached_assembler(backend: Arc<CountingBackend>, ttl: u64) -> ContextAssembler {
    let config = ContextConfig {
        cache_ttl: ttl,
        ..ContextConfig::default()
    };
    ContextAssembler::new(backend, Arc::new(JsonEncoder))
        .with_cache(Arc::new(MemoryCacheStore::new()))
        .with_config(config)
}

#[test]
fn repeated_calls_hit_the_cache_and_search_once() {
    let backend = Arc::new(CountingBackend::new());
    let assembler = cached_assembler(backend.clone(), 60);

    let first = assembler.build_context("q", &Metadata::new()).unwrap();
    let second = assembler.build_context("q", &Metadata::new()).unwrap();

    assert_eq!(first, second, "cached payload must be byte-identical");
    assert_eq!(backend.count(), 1, "the backend must be searched exactly once");
}

#[test]
fn cache_hit_emits_a_short_metric() {
    let backend = Arc::new(CountingBackend::new());
    let sink = Arc::new(CapturingSink::default());
    let assembler = cached_assembler(backend, 60).with_metrics(sink.clone());

    assembler.build_context("q", &Metadata::new()).unwrap();
    assembler.build_context("q", &Metadata::new()).unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].get("cache_hit"), Some(&json!(false)));
    assert_eq!(events[1].get("cache_hit"), Some(&json!(true)));
    assert!(
        events[1].get("document_count").is_none(),
        "hit metrics carry no selection details"
    );
}

#[test]
fn zero_ttl_disables_caching() {
    let backend = Arc::new(CountingBackend::new());
    let assembler = cached_assembler(backend.clone(), 0);

    assembler.build_context("q", &Metadata::new()).unwrap();
    assembler.build_context("q", &Metadata::new()).unwrap();

    assert_eq!(backend.count(), 2, "ttl zero must bypass the cache entirely");
}

#[test]
fn different_queries_use_different_entries() {
    let backend = Arc::new(CountingBackend::new());
    let assembler = cached_assembler(backend.clone(), 60);

    assembler.build_context("first", &Metadata::new()).unwrap();
    assembler.build_context("second", &Metadata::new()).unwrap();

    assert_eq!(backend.count(), 2);
}

#[test]
fn failing_store_degrades_to_uncached_operation() {
    let backend = Arc::new(CountingBackend::new());
    let config = ContextConfig {
        cache_ttl: 60,
        ..ContextConfig::default()
    };
    let assembler = ContextAssembler::new(backend.clone(), Arc::new(JsonEncoder))
        .with_cache(Arc::new(FailingStore))
        .with_config(config);

    let first = assembler.build_context("q", &Metadata::new()).unwrap();
    let second = assembler.build_context("q", &Metadata::new()).unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.count(), 2, "store failures must fall back to a full run");
}

#[test]
fn memory_store_round_trips_values() {
    let store = MemoryCacheStore::new();
    let config = ContextConfig::default();
    let key = CacheKey::derive("q", &Metadata::new(), &config);

    assert!(!store.has(&key).unwrap());
    assert_eq!(store.get(&key).unwrap(), None);

    store.put(&key, "payload-one", 60).unwrap();
    assert!(store.has(&key).unwrap());
    assert_eq!(store.get(&key).unwrap().as_deref(), Some("payload-one"));

    store.put(&key, "payload-two", 60).unwrap();
    assert_eq!(store.get(&key).unwrap().as_deref(), Some("payload-two"));
    assert_eq!(store.len(), 1);
}

#[test]
fn memory_store_keeps_zero_ttl_entries() {
    let store = MemoryCacheStore::new();
    let config = ContextConfig::default();
    let key = CacheKey::derive("forever", &Metadata::new(), &config);

    store.put(&key, "kept", 0).unwrap();

    assert!(store.has(&key).unwrap(), "zero ttl stores without expiry");
}
