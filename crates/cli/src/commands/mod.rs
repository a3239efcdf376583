//! CLI command implementations.
//!
//! # Environment Variables
//!
//! - `REALTIME_DB_URL` - Realtime database root
//! - `REALTIME_DB_SECRET` - Database secret or access token

pub mod promo;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use shopfront_core::db::{DbError, RepositoryError, RestDatabase};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Invalid argument or environment value.
    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, String),

    /// Reading the input file failed.
    #[error("Cannot read {0}: {1}")]
    Io(String, std::io::Error),

    /// The input file did not parse.
    #[error("Cannot parse {0}: {1}")]
    Parse(String, String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

/// Connect to the hosted database from environment variables.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` or `CliError::Invalid` if the variables
/// are missing or malformed.
pub fn connect() -> Result<RestDatabase, CliError> {
    dotenvy::dotenv().ok();

    let mut raw_url = std::env::var("REALTIME_DB_URL")
        .map_err(|_| CliError::MissingEnvVar("REALTIME_DB_URL"))?;
    if !raw_url.ends_with('/') {
        raw_url.push('/');
    }
    let url = Url::parse(&raw_url)
        .map_err(|e| CliError::Invalid("REALTIME_DB_URL", e.to_string()))?;
    let secret = std::env::var("REALTIME_DB_SECRET")
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("REALTIME_DB_SECRET"))?;

    tracing::info!(database = %url, "Connecting to database");
    Ok(RestDatabase::new(url, secret)?)
}
