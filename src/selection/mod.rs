pub mod budgeting;
pub mod filters;
pub mod summarize;
pub mod tokens;

pub use budgeting::TokenBudget;
pub use filters::{FilterSpec, MetadataFilters};
pub use summarize::{
    Summarize, SummarizeError, SummarizeFn, Summarizer, SummarizerRef, SummarizerRegistry,
};
pub use tokens::{ApproxTokenCounter, TokenCounter};

use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;
use crate::document::{Document, Metadata};

/// A document admitted into the final context. Its content may have been
/// summarized, truncated, or clipped, and `tokens` reflects the content as
/// admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedDocument {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Metadata,
    pub tokens: usize,
}

/// Outcome of one selection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub documents: Vec<SelectedDocument>,
    /// Total tokens consumed, initial (query) tokens included.
    pub total_tokens: usize,
}

/// Greedy, order-preserving document selection under a token budget.
///
/// Candidates are expected pre-filtered and pre-sorted by descending
/// relevance; the pass examines them exactly in the given order and never
/// re-orders them.
pub struct DocumentSelector<T = ApproxTokenCounter> {
    tokenizer: T,
    summarizer: Summarizer,
}

impl Default for DocumentSelector<ApproxTokenCounter> {
    fn default() -> Self {
        Self::new(ApproxTokenCounter, Summarizer::default())
    }
}

impl<T> DocumentSelector<T>
where
    T: TokenCounter,
{
    pub fn new(tokenizer: T, summarizer: Summarizer) -> Self {
        Self {
            tokenizer,
            summarizer,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Select documents respecting the token budget, the document limit,
    /// and the per-document snippet cap.
    ///
    /// The pass stops outright once the limit is reached or the budget is
    /// exhausted; a candidate no strategy can fit is skipped and scanning
    /// continues.
    pub fn select(
        &self,
        candidates: Vec<Document>,
        config: &ContextConfig,
        initial_tokens: usize,
    ) -> Selection {
        let mut budget = TokenBudget::new(config.max_tokens, initial_tokens);
        let mut documents: Vec<SelectedDocument> = Vec::new();

        // Empty content is re-filtered here even though the caller's
        // filtering stage should have removed it already.
        for candidate in candidates.into_iter().filter(|doc| !doc.content.is_empty()) {
            if documents.len() >= config.limit || budget.remaining() == 0 {
                break;
            }

            let Document {
                id,
                content,
                score,
                metadata,
            } = candidate;

            let tokens = self.tokenizer.count_tokens(&content);
            let fitted = if budget.can_fit(tokens) {
                content
            } else {
                match self.reduce_to_fit(&content, &budget, config) {
                    Some(reduced) => reduced,
                    None if budget.remaining() == 0 => break,
                    None => continue,
                }
            };

            let clipped = clip_chars(fitted, config.max_snippet);
            let clipped_tokens = self.tokenizer.count_tokens(&clipped);
            if !budget.can_fit(clipped_tokens) {
                continue;
            }

            budget.consume(clipped_tokens);
            documents.push(SelectedDocument {
                id,
                content: clipped,
                score,
                metadata,
                tokens: clipped_tokens,
            });
        }

        Selection {
            documents,
            total_tokens: budget.used(),
        }
    }

    /// Reduce oversized content into the remaining budget: summarization
    /// first when enabled, then character truncation. `None` means no
    /// strategy produced fitting content.
    fn reduce_to_fit(
        &self,
        content: &str,
        budget: &TokenBudget,
        config: &ContextConfig,
    ) -> Option<String> {
        let remaining = budget.remaining();
        if remaining == 0 {
            return None;
        }

        if config.summarize {
            let summary = self
                .summarizer
                .summarize(&config.summarizer, content, remaining);
            // An empty summary counts as no summary.
            if !summary.is_empty() && self.tokenizer.count_tokens(&summary) <= remaining {
                return Some(summary);
            }
        }

        let truncated = truncate_chars(content, budget.max_chars_for_remaining());
        if self.tokenizer.count_tokens(&truncated) <= remaining {
            return Some(truncated);
        }

        None
    }
}

fn truncate_chars(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

fn clip_chars(content: String, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content
    } else {
        content.chars().take(max_chars).collect()
    }
}
