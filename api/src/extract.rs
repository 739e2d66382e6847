//! Custom extractors that convert axum rejections to the uniform error envelope.
//!
//! Use `AppJson<T>` as a drop-in replacement for `axum::Json<T>` in handler
//! signatures. Unlike the standard extractor, deserialization failures produce
//! a JSON envelope with status 400 instead of axum's default plain-text 422.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

/// Convert a `JsonRejection` to `AppError::Validation`.
pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field_hint = extract_field_from_serde_message(&body_text);

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field_hint.unwrap_or("body".to_string())),
    }
}

/// Try to extract a field name from serde's error messages.
/// "missing field `content`" and "unknown field `foo`" both carry one.
fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    for pattern in ["missing field `", "unknown field `"] {
        if let Some(start) = msg.find(pattern) {
            let after = &msg[start + pattern.len()..];
            if let Some(end) = after.find('`') {
                return Some(after[..end].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize: missing field `content` at line 1 column 2";
        assert_eq!(
            extract_field_from_serde_message(msg),
            Some("content".to_string())
        );
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `entry`, expected one of `content`, `entryId`, `isTest`";
        assert_eq!(
            extract_field_from_serde_message(msg),
            Some("entry".to_string())
        );
    }

    #[test]
    fn returns_none_for_generic_error() {
        let msg = "invalid type: string, expected a boolean";
        assert_eq!(extract_field_from_serde_message(msg), None);
    }
}
