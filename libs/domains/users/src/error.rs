use thiserror::Error;

use crate::models::Field;

/// The storage layer rejected an insert because a unique constraint already
/// holds the value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unique constraint '{constraint}' violated on field '{field}'")]
pub struct ConflictError {
    pub field: Field,
    pub constraint: String,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Password hashing failed (bad parameters or resource exhaustion)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Password hashing error: {0}")]
pub struct HashError(pub String);

/// Unrecoverable failure of a registration attempt
///
/// Never caused by user input. Callers log it and show a generic failure.
#[derive(Debug, Error)]
pub enum RegistrationFault {
    #[error(transparent)]
    PasswordHash(#[from] HashError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}
