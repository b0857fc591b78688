/// Domain error taxonomy
///
/// Every service operation fails with a [`ServiceError`]. The HTTP layer maps
/// each variant to a status code; nothing here knows about HTTP.

use crate::repository::{Missing, RepositoryError};

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type for task, user and session operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed required field
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(Missing),

    /// Bad credentials; deliberately carries no detail
    #[error("Invalid credentials")]
    Authentication,

    /// Caller lacks the role or ownership for the operation
    #[error("{0}")]
    Authorization(String),

    /// Conditional write lost against a concurrent one, or a uniqueness clash
    #[error("{0}")]
    Conflict(String),

    /// Unexpected store failure; the detail is for logs only
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ServiceError {
    /// The message used when any required field is absent
    pub const MISSING_FIELDS: &'static str = "Missing required fields";

    pub fn missing_fields() -> Self {
        ServiceError::Validation(Self::MISSING_FIELDS.to_string())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ServiceError::NotFound(what),
            RepositoryError::Duplicate(field) => {
                ServiceError::Conflict(format!("A user with this {field} already exists"))
            }
            RepositoryError::VersionConflict { id, expected, found } => ServiceError::Conflict(
                format!("Task {id} was modified concurrently (expected version {expected}, found {found})"),
            ),
            RepositoryError::Database(detail) => ServiceError::Persistence(detail),
        }
    }
}

impl From<crate::auth::password::PasswordError> for ServiceError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        ServiceError::Persistence(format!("Password operation failed: {err}"))
    }
}

impl From<crate::auth::jwt::JwtError> for ServiceError {
    fn from(err: crate::auth::jwt::JwtError) -> Self {
        ServiceError::Persistence(format!("Session token operation failed: {err}"))
    }
}

impl From<crate::auth::authorization::AuthzError> for ServiceError {
    fn from(err: crate::auth::authorization::AuthzError) -> Self {
        ServiceError::Authorization(err.to_string())
    }
}
