use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(
        "time slot {start}-{end} on {date} is already occupied by \"{occupied_by}\" ({occupied_start}-{occupied_end}, entry {entry_id})"
    )]
    Conflict {
        date: NaiveDate,
        start: String,
        end: String,
        entry_id: String,
        occupied_by: String,
        occupied_start: String,
        occupied_end: String,
    },

    #[error("timeline entry not found: {0}")]
    NotFound(String),
}

impl PlanError {
    pub fn validation(message: impl Into<String>) -> Self {
        PlanError::Validation(message.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PlanError::Conflict { .. })
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
