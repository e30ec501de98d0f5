//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] estate_desk_core::EmailError),

    /// Unknown email, wrong password or inactive account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired or wrong-type bearer token.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Email already registered.
    #[error("email already exists")]
    EmailTaken,

    /// Password does not meet requirements.
    #[error("{0}")]
    WeakPassword(String),

    /// Advisor account without a linked employee.
    #[error("advisor accounts must be linked to an employee")]
    EmployeeRequired,

    /// The change would leave no active broker.
    #[error("the last active broker cannot be demoted or deactivated")]
    LastBroker,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token encoding error: {0}")]
    TokenEncoding(#[source] jsonwebtoken::errors::Error),
}
