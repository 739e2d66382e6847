use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use solace_core::analysis::AnalysisResult;
use solace_core::error::ErrorEnvelope;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::pipeline::{self, AnalyzeOutcome, AnalyzeRequest};
use crate::state::AppState;
use crate::store::PgEntryStore;

pub fn router() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_entry))
}

/// Raw model text, emitted in test mode instead of a normalized result.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RawResponse {
    pub raw_response: String,
}

/// Analyze one journal entry.
///
/// Normal mode returns the normalized analysis and, when `entryId` is
/// given, records it on that entry. Test mode (`isTest`) returns the
/// model's raw text untouched and never persists.
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Normalized analysis result (raw model text in test mode)", body = AnalysisResult),
        (status = 400, description = "Missing or oversized content", body = ErrorEnvelope),
        (status = 500, description = "Model, parsing, or persistence failure", body = ErrorEnvelope)
    ),
    tag = "analysis"
)]
pub async fn analyze_entry(
    State(state): State<AppState>,
    AppJson(request): AppJson<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = PgEntryStore::new(state.db.clone());
    let outcome = pipeline::run(request, &state.gateway, &store).await?;

    let response = match outcome {
        AnalyzeOutcome::Raw(raw_response) => Json(RawResponse { raw_response }).into_response(),
        AnalyzeOutcome::Analysis(analysis) => Json(analysis).into_response(),
    };
    Ok(response)
}
