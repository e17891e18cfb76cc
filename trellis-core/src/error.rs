use thiserror::Error;
use trellis_model::FieldViolation;

/// Error taxonomy surfaced by the task service and the ordering store.
///
/// Only `Conflict` is retryable, and only by the caller with fresh state;
/// nothing here is retried or swallowed internally.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The actor lacks the capability for this action on this task.
    #[error("permission denied")]
    Forbidden,

    /// The referenced task or user does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// One or more field values are out of range or malformed.
    #[error("validation failed")]
    Validation(Vec<FieldViolation>),

    /// A concurrent transaction invalidated this read-then-write sequence.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;

impl TaskError {
    /// Single-field validation failure.
    pub fn validation(
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Classify a sqlx error. Serialization failures, deadlocks, and lock
    /// timeouts become `Conflict` so callers know a retry with fresh state
    /// is worthwhile; everything else is passed through as `Database`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("task"),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("40001") | Some("40P01") => Self::Conflict(
                    "serialization failure, retry with fresh state".into(),
                ),
                Some("55P03") => {
                    Self::Conflict("lock timeout exceeded".into())
                }
                _ => Self::Database(err),
            },
            _ => Self::Database(err),
        }
    }

    /// Field violations carried by a `Validation` error, if any.
    pub fn violations(&self) -> Option<&[FieldViolation]> {
        match self {
            Self::Validation(violations) => Some(violations),
            _ => None,
        }
    }
}
