//! CLI command implementations.

pub mod migrate;
pub mod settings;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Settings table read or write failed.
    #[error("Settings error: {0}")]
    Repository(#[from] orchard_storefront::db::RepositoryError),

    /// Key is not one the store reads.
    #[error(
        "Unknown setting: {0}. Known settings: {known}",
        known = orchard_core::settings::keys::ALL.join(", ")
    )]
    UnknownSetting(String),

    /// Value does not parse for its key.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Storefront database URL, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}
