use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics sink failure: {0}")]
    Sink(String),
}

impl MetricsError {
    pub fn sink(message: impl Into<String>) -> Self {
        MetricsError::Sink(message.into())
    }
}

/// A single observation: an event kind plus a flat field map.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
    kind: String,
    fields: BTreeMap<String, Value>,
}

impl MetricEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        MetricEvent {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

/// Receives observations, fire-and-forget. Failures never influence the
/// primary return path.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: &MetricEvent) -> Result<(), MetricsError>;
}

/// Discards every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _event: &MetricEvent) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Emits observations to the active tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn record(&self, event: &MetricEvent) -> Result<(), MetricsError> {
        info!(kind = %event.kind(), fields = ?event.fields(), "metric recorded");
        Ok(())
    }
}
