use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform error envelope returned by every failing request.
/// `error` is a machine-readable code from [`codes`]; `details` is the
/// human-readable description. No partial analysis result is ever emitted
/// alongside an error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Machine-readable error code (e.g. "validation_error", "persistence_error")
    pub error: String,
    /// Human-readable description of what went wrong
    pub details: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

/// Error codes used across the API
pub mod codes {
    /// Bad or missing input content. Client error, not retried.
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Upstream HTTP/transport failure at the model gateway. Not retried;
    /// the caller may resubmit.
    pub const GATEWAY_ERROR: &str = "gateway_error";
    /// The model call succeeded but yielded no text.
    pub const EMPTY_COMPLETION: &str = "empty_completion";
    /// The model output was not parseable as JSON. Not retried (sampling is
    /// deterministic); logged with the raw text for offline prompt-tuning.
    pub const MALFORMED_RESPONSE: &str = "malformed_response";
    /// The entry store write failed after a successful analysis. The entry
    /// keeps its prior status so the client can re-trigger.
    pub const PERSISTENCE_ERROR: &str = "persistence_error";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
