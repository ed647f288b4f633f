use thiserror::Error;

use crate::db::DatabaseError;

/// Engine-level error taxonomy. Validation and authorization errors are
/// always surfaced to the caller and never retried; delivery failures are
/// not errors at this level (they are recorded, not propagated).
#[derive(Debug, Error)]
pub enum CareError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: i64 },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl CareError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}
