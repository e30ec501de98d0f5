//! CLI subcommands.

pub mod migrate;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

/// Database URL from `API_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("API_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Connect with a single-use pool.
pub async fn connect(url: &SecretString) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to database...");
    PgPool::connect(url.expose_secret()).await
}
