use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serializes an assembled payload into its final string form.
///
/// The wire format is a collaborator concern; encoding failures propagate
/// to the caller uncaught.
pub trait Encoder: Send + Sync {
    fn encode(&self, payload: &Value) -> Result<String, EncodeError>;
}

/// Compact JSON encoder, the bundled default.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, payload: &Value) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(payload)?)
    }
}
