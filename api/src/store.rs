//! Persistence of analysis results onto journal entries.

use std::future::Future;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use solace_core::analysis::AnalysisResult;
use solace_core::entry::EntryStatus;

use crate::error::AppError;

/// Capability seam for the entry update, so the pipeline can run against
/// stubs in tests.
pub trait EntryStore {
    /// Write the analysis fields onto one entry and flip it to complete.
    fn complete_entry(
        &self,
        entry_id: Uuid,
        analysis: &AnalysisResult,
        raw_output: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Postgres-backed store. One point-write per analysis, keyed by id only:
/// the update never reads first, so concurrent analyses of the same entry
/// simply race and the last writer wins.
#[derive(Clone)]
pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EntryStore for PgEntryStore {
    async fn complete_entry(
        &self,
        entry_id: Uuid,
        analysis: &AnalysisResult,
        raw_output: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE journal_entries
            SET themes = $2,
                emotion = $3,
                reflection = $4,
                evidence = $5,
                crisis_flag = $6,
                confidence = $7,
                language = $8,
                raw_ai_output = $9,
                status = $10,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .bind(as_json(&analysis.themes)?)
        .bind(as_json(&analysis.emotion)?)
        .bind(&analysis.reflection)
        .bind(as_json(&analysis.evidence)?)
        .bind(analysis.crisis_flag)
        .bind(analysis.confidence)
        .bind(&analysis.language)
        .bind(raw_output)
        .bind(EntryStatus::Complete.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Persistence {
                detail: format!("journal entry {entry_id} not found"),
            });
        }

        tracing::debug!(entry_id = %entry_id, status = %EntryStatus::Complete, "journal entry updated");
        Ok(())
    }
}

fn as_json<T: Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value)
        .map_err(|err| AppError::Internal(format!("failed to encode analysis field: {err}")))
}
