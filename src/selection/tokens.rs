pub trait TokenCounter {
    fn count_tokens(&self, content: &str) -> usize;
}

/// Approximate GPT-style tokenization:
/// tokens(content) := ceil(byte_len(content) / 4)
///
/// Token counts are an approximation throughout; nothing here guarantees
/// exact tokenizer parity.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, content: &str) -> usize {
        if content.is_empty() {
            0
        } else {
            (content.len() + 3) / 4
        }
    }
}
