//! Store settings commands.
//!
//! # Usage
//!
//! ```bash
//! orchard-cli settings list
//! orchard-cli settings get tax_rate
//! orchard-cli settings set tax_rate 8
//! ```
//!
//! The storefront reads settings once at startup, so changes take effect on
//! the next restart.

use rust_decimal::Decimal;

use orchard_core::settings::keys;
use orchard_storefront::db::{self, PgSettings, SettingsProvider};

use super::{CommandError, database_url};

async fn connect() -> Result<PgSettings, CommandError> {
    let pool = db::create_pool(&database_url()?).await?;
    Ok(PgSettings::new(pool))
}

/// Reject keys the store never reads and values it would ignore.
///
/// # Errors
///
/// Returns `CommandError::UnknownSetting` or `CommandError::InvalidValue`.
pub fn validate(key: &str, value: &str) -> Result<(), CommandError> {
    if !keys::ALL.contains(&key) {
        return Err(CommandError::UnknownSetting(key.to_owned()));
    }

    let value = value.trim();
    let valid = if key == keys::LOW_STOCK_THRESHOLD {
        value.parse::<i32>().is_ok_and(|n| n >= 0)
    } else {
        value
            .parse::<Decimal>()
            .is_ok_and(|d| !d.is_sign_negative())
    };

    if valid {
        Ok(())
    } else {
        Err(CommandError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Print one setting. Unset settings print as an empty line.
///
/// # Errors
///
/// Returns an error if the key is unknown or the database fails.
pub async fn get(key: &str) -> Result<(), CommandError> {
    if !keys::ALL.contains(&key) {
        return Err(CommandError::UnknownSetting(key.to_owned()));
    }

    let value = connect().await?.get_setting(key).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{value}");
    }
    Ok(())
}

/// Store one setting after validating it.
///
/// # Errors
///
/// Returns an error if validation fails or the database fails.
pub async fn set(key: &str, value: &str) -> Result<(), CommandError> {
    validate(key, value)?;

    connect().await?.set_setting(key, value.trim()).await?;
    tracing::info!(%key, value = value.trim(), "Setting saved");
    Ok(())
}

/// Print every stored setting.
///
/// # Errors
///
/// Returns an error if the database fails.
pub async fn list() -> Result<(), CommandError> {
    let settings = connect().await?.list_settings().await?;

    #[allow(clippy::print_stdout)]
    {
        for (key, value) in settings {
            println!("{key} = {value}");
        }
    }
    Ok(())
}
