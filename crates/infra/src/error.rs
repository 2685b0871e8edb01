use thiserror::Error;

use epiccrm_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// These are infrastructure errors (missing rows, uniqueness, connectivity),
/// as opposed to the authorization failures raised before a store is touched.
///
/// | Postgres condition | Variant |
/// |---|---|
/// | unique violation (`23505`) | `Conflict` |
/// | foreign key violation (`23503`) | `Conflict` |
/// | check violation (`23514`) | `Validation` |
/// | anything else | `Backend` |
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => StoreError::Validation(msg),
        }
    }
}
