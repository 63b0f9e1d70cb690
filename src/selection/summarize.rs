use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarizer failure: {0}")]
    Failed(String),
}

impl SummarizeError {
    pub fn failed(message: impl Into<String>) -> Self {
        SummarizeError::Failed(message.into())
    }
}

/// A text-reduction capability: shrink `content` toward `target_tokens`.
pub trait Summarize: Send + Sync {
    fn summarize(&self, content: &str, target_tokens: usize) -> Result<String, SummarizeError>;
}

pub type SummarizeFn = Arc<dyn Fn(&str, usize) -> Result<String, SummarizeError> + Send + Sync>;

/// How a configuration refers to its summarizer.
///
/// `Named` references are resolved through a [`SummarizerRegistry`] at
/// invocation time; the other variants are supplied programmatically.
#[derive(Clone, Default)]
pub enum SummarizerRef {
    #[default]
    None,
    Named(String),
    Invocable(SummarizeFn),
    Capability(Arc<dyn Summarize>),
}

impl fmt::Debug for SummarizerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummarizerRef::None => f.write_str("None"),
            SummarizerRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            SummarizerRef::Invocable(_) => f.write_str("Invocable(..)"),
            SummarizerRef::Capability(_) => f.write_str("Capability(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for SummarizerRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(match name {
            None => SummarizerRef::None,
            Some(name) => SummarizerRef::Named(name),
        })
    }
}

/// Named summarizer lookup table.
#[derive(Clone, Default)]
pub struct SummarizerRegistry {
    entries: BTreeMap<String, Arc<dyn Summarize>>,
}

impl SummarizerRegistry {
    pub fn new() -> Self {
        SummarizerRegistry::default()
    }

    pub fn register(&mut self, name: impl Into<String>, summarizer: Arc<dyn Summarize>) {
        self.entries.insert(name.into(), summarizer);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Summarize>> {
        self.entries.get(name).cloned()
    }
}

impl fmt::Debug for SummarizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Resolves a summarizer reference and invokes it.
///
/// Resolution and invocation failures degrade to the original content;
/// this call never fails outward.
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    registry: SummarizerRegistry,
}

impl Summarizer {
    pub fn new(registry: SummarizerRegistry) -> Self {
        Summarizer { registry }
    }

    pub fn summarize(
        &self,
        reference: &SummarizerRef,
        content: &str,
        target_tokens: usize,
    ) -> String {
        let result = match reference {
            SummarizerRef::None => return content.to_string(),
            SummarizerRef::Named(name) => match self.registry.resolve(name) {
                Some(capability) => capability.summarize(content, target_tokens),
                None => {
                    debug!(name = %name, "summarizer not registered, leaving content unchanged");
                    return content.to_string();
                }
            },
            SummarizerRef::Invocable(invocable) => invocable(content, target_tokens),
            SummarizerRef::Capability(capability) => capability.summarize(content, target_tokens),
        };

        match result {
            Ok(summary) => summary,
            Err(err) => {
                debug!(error = %err, "summarization failed, leaving content unchanged");
                content.to_string()
            }
        }
    }
}
