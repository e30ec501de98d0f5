//! Login account commands.
//!
//! Bootstraps the first broker, who then manages everyone else through
//! the API.

use thiserror::Error;

use estate_desk_api::models::user::NewUserInput;
use estate_desk_api::services::{AccountService, AuthError};
use estate_desk_core::{Email, EmailError, EmployeeId, Role};

/// Errors that can occur during account commands.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Missing environment variable: API_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: broker, secretary, advisor")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a login account.
///
/// Returns the new account's ID.
pub async fn create(
    email: &str,
    role: &str,
    employee_id: Option<i32>,
    password: &str,
) -> Result<i32, UserError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let url = super::database_url().ok_or(UserError::MissingDatabaseUrl)?;
    let pool = super::connect(&url).await?;

    tracing::info!("Creating {} account: {}", role, email);

    let user = AccountService::new(&pool)
        .register(&NewUserInput {
            email,
            password: password.to_owned(),
            role,
            employee_id: employee_id.map(EmployeeId::new),
        })
        .await?;

    tracing::info!(
        "Account created. ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id.as_i32())
}

/// Replace the password of an existing account.
pub async fn reset_password(email: &str, password: &str) -> Result<(), UserError> {
    let email = Email::parse(email)?;

    let url = super::database_url().ok_or(UserError::MissingDatabaseUrl)?;
    let pool = super::connect(&url).await?;

    let id = AccountService::new(&pool)
        .reset_password(&email, password)
        .await?;

    tracing::info!("Password replaced for account {} ({})", id, email);
    tracing::warn!("Tokens issued before the reset stay valid until they expire");
    Ok(())
}
