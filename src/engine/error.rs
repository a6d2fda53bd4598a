use thiserror::Error;
use ulid::Ulid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("no availability profile for coach {0}")]
    NotFound(Ulid),
    #[error("version conflict for coach {coach_id}: expected {expected}, found {found}")]
    VersionConflict {
        coach_id: Ulid,
        expected: u64,
        found: u64,
    },
    #[error("range spans {days} days, cap is {cap}")]
    RangeTooLarge { days: i64, cap: i64 },
    #[error("external store: {0}")]
    Store(String),
    #[error("generation cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }
}
