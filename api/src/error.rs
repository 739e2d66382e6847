use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use solace_core::analysis::MalformedModelOutput;
use solace_core::error::{ErrorEnvelope, codes};

/// Internal error type that converts to the wire envelope.
///
/// The split matters operationally: `Validation` is the caller's fault and
/// the only 400; everything else is a pipeline failure reported as 500.
/// `Persistence` is kept distinct from `Internal` because by then the
/// analysis itself succeeded and only the save step was lost.
#[derive(Debug)]
pub enum AppError {
    /// Request content missing or unusable (400)
    Validation {
        message: String,
        field: Option<String>,
    },
    /// Upstream model call failed, timed out, or answered undecodably (500)
    Gateway {
        status: Option<u16>,
        detail: String,
    },
    /// Upstream success but no completion text to work with (500)
    EmptyCompletion,
    /// Model text was not the strict JSON it was instructed to emit (500)
    MalformedResponse { raw: String },
    /// Analysis computed but the entry update did not land (500)
    Persistence { detail: String },
    /// Anything else (500)
    Internal(String),
}

impl AppError {
    fn to_parts(self) -> (StatusCode, ErrorEnvelope) {
        match self {
            AppError::Validation { message, field } => {
                let details = match field {
                    Some(field) => format!("{field}: {message}"),
                    None => message,
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorEnvelope::new(codes::VALIDATION_ERROR, details),
                )
            }
            AppError::Gateway { status, detail } => {
                let details = match status {
                    Some(status) => format!("model gateway returned status {status}: {detail}"),
                    None => format!("model gateway unreachable: {detail}"),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new(codes::GATEWAY_ERROR, details),
                )
            }
            AppError::EmptyCompletion => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(
                    codes::EMPTY_COMPLETION,
                    "model returned no completion text",
                ),
            ),
            AppError::MalformedResponse { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(
                    codes::MALFORMED_RESPONSE,
                    "model output was not valid JSON",
                ),
            ),
            AppError::Persistence { detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(
                    codes::PERSISTENCE_ERROR,
                    format!("analysis succeeded but could not be saved: {detail}"),
                ),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(codes::INTERNAL_ERROR, "an internal error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation { message, field } => {
                tracing::debug!(field = field.as_deref(), message, "request rejected");
            }
            AppError::Gateway { status, detail } => {
                tracing::error!(status, detail, "model gateway call failed");
            }
            AppError::EmptyCompletion => {
                tracing::error!("model returned an empty completion");
            }
            // The raw text goes to the log, never to the client. Offline
            // prompt-tuning needs it; callers do not.
            AppError::MalformedResponse { raw } => {
                tracing::error!(raw, "model output was not parseable as JSON");
            }
            AppError::Persistence { detail } => {
                tracing::error!(detail, "entry update failed after successful analysis");
            }
            AppError::Internal(message) => {
                tracing::error!(message, "internal error");
            }
        }

        let (status, envelope) = self.to_parts();
        (status, Json(envelope)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence {
            detail: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway {
            status: err.status().map(|status| status.as_u16()),
            detail: err.to_string(),
        }
    }
}

impl From<MalformedModelOutput> for AppError {
    fn from(err: MalformedModelOutput) -> Self {
        AppError::MalformedResponse { raw: err.raw }
    }
}
