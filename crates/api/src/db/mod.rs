//! Database operations for the brokerage back office.
//!
//! ## Tables
//!
//! - `users` - Login accounts with role and optional employee link
//! - `employees` - Staff profiles, served zones, rotation pointer
//! - `properties`, `property_images`, `property_documents` - Listings
//! - `clients`, `client_interactions` - Contacts and their append-only history
//! - `visits` - Scheduled property visits
//! - `operations`, `commission_shares` - Closed deals and their commission split
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p estate-desk-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

pub mod clients;
pub mod employees;
pub mod operations;
pub mod properties;
pub mod reports;
pub mod users;
pub mod visits;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use clients::ClientRepository;
pub use employees::EmployeeRepository;
pub use operations::OperationRepository;
pub use properties::PropertyRepository;
pub use reports::ReportRepository;
pub use users::UserRepository;
pub use visits::VisitRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Constraint violation (unique, foreign key or check).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Translate constraint violations into `Conflict`, keeping other errors.
    ///
    /// The message names the violated constraint so callers can tell a
    /// duplicate code from a dangling reference without seeing raw SQL.
    #[must_use]
    pub fn from_constraint(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or("constraint");
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("duplicate value violates {constraint}"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("referenced record is missing or in use ({constraint})"));
            }
            if db_err.is_check_violation() {
                return Self::Conflict(format!("value violates {constraint}"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Clamp pagination input to `(limit, offset)`.
///
/// `page` below 1 becomes 1; `page_size` outside 1-100 falls back to 10.
/// The offset saturates instead of overflowing on absurd page numbers.
#[must_use]
pub fn limit_offset(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let size = if (1..=100).contains(&page_size) {
        page_size
    } else {
        10
    };
    (size, (page - 1).saturating_mul(size))
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(1, 10), (10, 0));
        assert_eq!(limit_offset(3, 25), (25, 50));
        assert_eq!(limit_offset(0, 10), (10, 0));
        assert_eq!(limit_offset(2, 0), (10, 10));
        assert_eq!(limit_offset(2, 101), (10, 10));
    }

    #[test]
    fn test_limit_offset_huge_page_saturates() {
        assert_eq!(limit_offset(i64::MAX, 10), (10, i64::MAX));
        assert_eq!(limit_offset(i64::MAX / 2, 100), (100, i64::MAX));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" casa "), "%casa%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
