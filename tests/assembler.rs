use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use rag_core::assembler::{AssembleError, ContextAssembler};
use rag_core::backend::{BackendError, SearchBackend, SearchHit};
use rag_core::config::ContextConfig;
use rag_core::document::Metadata;
use rag_core::encoding::JsonEncoder;
use rag_core::metrics::{MetricEvent, MetricsError, MetricsSink};

struct FixedBackend(Vec<SearchHit>);

impl SearchBackend for FixedBackend {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        Ok(self.0.clone())
    }
}

struct FailingBackend;

impl SearchBackend for FailingBackend {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        Err(BackendError::failed("connection refused"))
    }
}

struct RecordingBackend {
    calls: Mutex<Vec<(String, usize)>>,
}

impl SearchBackend for RecordingBackend {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        Ok(Vec::new())
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

struct FailingSink;

impl MetricsSink for FailingSink {
    fn record(&self, _event: &MetricEvent) -> Result<(), MetricsError> {
        Err(MetricsError::sink("sink offline"))
    }
}

fn assembler(hits: Vec<SearchHit>) -> ContextAssembler {
    ContextAssembler::new(Arc::new(FixedBackend(hits)), Arc::new(JsonEncoder))
}

fn parse(encoded: &str) -> Value {
    serde_json::from_str(encoded).expect("payload should be valid JSON")
}

#[test]
fn payload_merges_metadata_query_and_documents() {
    let hits = vec![SearchHit::new("hello world").with_id("doc-1").with_score(0.7)];
    let mut metadata = Metadata::new();
    metadata.insert("tenant", "acme");

    let encoded = assembler(hits)
        .build_context("greeting", &metadata)
        .unwrap();
    let payload = parse(&encoded);

    assert_eq!(payload["tenant"], json!("acme"));
    assert_eq!(payload["query"], json!("greeting"));
    let docs = payload["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], json!("doc-1"));
    assert_eq!(docs[0]["content"], json!("hello world"));
    assert_eq!(docs[0]["score"], json!(0.7));
    assert_eq!(docs[0]["tokens"], json!(3));
}

#[test]
fn reserved_payload_keys_win_on_collision() {
    let mut metadata = Metadata::new();
    metadata.insert("query", "shadowed");
    metadata.insert("documents", "also shadowed");

    let encoded = assembler(Vec::new())
        .build_context("actual question", &metadata)
        .unwrap();
    let payload = parse(&encoded);

    assert_eq!(payload["query"], json!("actual question"));
    assert!(payload["documents"].is_array());
}

#[test]
fn hits_are_normalized_with_defaults() {
    let hits = vec![SearchHit::new("bare content")];

    let encoded = assembler(hits).build_context("q", &Metadata::new()).unwrap();
    let payload = parse(&encoded);

    let doc = &payload["documents"][0];
    assert!(
        !doc["id"].as_str().unwrap().is_empty(),
        "absent ids must be generated"
    );
    assert_eq!(doc["score"], json!(0.0));
    assert_eq!(doc["metadata"], json!({}));
}

#[test]
fn empty_backend_yields_empty_documents() {
    let encoded = assembler(Vec::new())
        .build_context("anything", &Metadata::new())
        .unwrap();
    let payload = parse(&encoded);

    assert_eq!(payload["documents"], json!([]));
}

#[test]
fn backend_failure_propagates() {
    let assembler = ContextAssembler::new(Arc::new(FailingBackend), Arc::new(JsonEncoder));

    let result = assembler.build_context("q", &Metadata::new());

    assert!(matches!(result, Err(AssembleError::Backend(_))));
}

#[test]
fn search_receives_the_configured_limit() {
    let backend = Arc::new(RecordingBackend {
        calls: Mutex::new(Vec::new()),
    });
    let config = ContextConfig {
        search_limit: 25,
        ..ContextConfig::default()
    };
    let assembler = ContextAssembler::new(backend.clone(), Arc::new(JsonEncoder))
        .with_config(config);

    assembler.build_context("the question", &Metadata::new()).unwrap();

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("the question".to_string(), 25)]);
}

#[test]
fn search_metric_is_recorded_on_a_miss() {
    let sink = Arc::new(CapturingSink::default());
    let hits = vec![SearchHit::new("content body").with_id("d").with_score(0.9)];
    let assembler = assembler(hits).with_metrics(sink.clone());

    assembler.build_context("metric query", &Metadata::new()).unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind(), "rag_search");
    assert_eq!(event.get("query"), Some(&json!("metric query")));
    assert_eq!(event.get("cache_hit"), Some(&json!(false)));
    assert_eq!(event.get("document_count"), Some(&json!(1)));
    // "metric query" is 12 bytes -> 3 tokens
    assert_eq!(event.get("query_tokens"), Some(&json!(3)));
    assert_eq!(event.get("total_tokens"), Some(&json!(6)));
    assert!(event.get("latency_ms").is_some());
}

#[test]
fn metrics_failure_never_affects_the_result() {
    let hits = vec![SearchHit::new("content").with_id("d").with_score(0.5)];
    let assembler = assembler(hits).with_metrics(Arc::new(FailingSink));

    let result = assembler.build_context("q", &Metadata::new());

    assert!(result.is_ok(), "metrics failures must be fire-and-forget");
}

#[test]
fn no_metrics_sink_is_fine() {
    let result = assembler(Vec::new()).build_context("q", &Metadata::new());
    assert!(result.is_ok());
}
