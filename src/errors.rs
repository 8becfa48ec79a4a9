use sea_orm::error::DbErr;
use serde::Serialize;

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    /// The persistence layer failed for reasons unrelated to business rules
    /// (connectivity, serialization conflict). Callers may retry.
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A business rule was broken: negative quantity, quantity above the
    /// account ceiling, max below reorder level, inactive product,
    /// non-positive transfer quantity, deleting a non-empty account.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A transfer transition was attempted from a state that does not
    /// permit it.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Duplicate account pair or a lost optimistic-concurrency race.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event error: {0}")]
    EventError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a database error. Used at every persistence call site so the
    /// system-failure class stays distinguishable from business failures.
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    /// Whether a caller may reasonably retry the operation. Business rule
    /// failures are never retryable; they are deterministic on input and
    /// current state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::Conflict(_) | Self::EventError(_)
        )
    }

    /// Returns the error message suitable for user-facing surfaces.
    /// System failures return a generic message to avoid leaking
    /// implementation details.
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::EventError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
