//! JSON-LD as a trait boundary only: context expansion and compaction
//! need a real processor (`json-ld`, `sophia`, ...) that the ambient
//! stack doesn't carry, so this module defines the shape a collaborator
//! plugs a real processor into.

use monarch_core::Value;

#[derive(Debug, thiserror::Error)]
pub enum JsonLdError {
    #[error("JSON-LD processing error: {0}")]
    Processing(String),
}

/// Expands and compacts JSON-LD documents against a `@context`. No
/// implementation ships here.
pub trait JsonLdProcessor {
    fn expand(&self, document: &Value) -> Result<Value, JsonLdError>;
    fn compact(&self, document: &Value, context: &Value) -> Result<Value, JsonLdError>;
}
