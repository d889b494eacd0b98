//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;

/// Read `DATABASE_URL`, loading `.env` first.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MissingDatabaseUrl)
}

/// `DATABASE_URL` is not set.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: DATABASE_URL")]
pub struct MissingDatabaseUrl;
