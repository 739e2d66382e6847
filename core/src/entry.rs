use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Analysis lifecycle of a journal entry.
///
/// Entries are created as `Pending` by the writing client. The pipeline's
/// single persistence write moves them to `Complete`. `Failed` is reserved
/// for operator tooling that parks entries which should never be analyzed
/// again; the pipeline itself never writes it, so a failed request leaves
/// the entry `Pending` and freely resubmittable.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Complete,
    Failed,
}

impl EntryStatus {
    /// Database representation, matching the `journal_entries.status`
    /// check constraint.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Complete => "complete",
            EntryStatus::Failed => "failed",
        }
    }

    /// Whether `next` is a legal forward transition. Only `Pending` moves;
    /// `Complete` and `Failed` are terminal.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Complete) | (EntryStatus::Pending, EntryStatus::Failed)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
