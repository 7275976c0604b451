//! Settings storage.
//!
//! Settings are plain key/value strings. A missing key reads as an empty
//! string; [`StoreSettings::from_values`] applies the numeric fallbacks.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use orchard_core::settings::{StoreSettings, keys};

use super::RepositoryError;

/// Read-only source of store settings.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Value for `key`, or an empty string if unset.
    async fn get_setting(&self, key: &str) -> Result<String, RepositoryError>;

    /// Values for `keys`; unset keys map to an empty string.
    async fn get_settings(&self, keys: &[&str]) -> Result<HashMap<String, String>, RepositoryError>;
}

/// Build typed settings from a provider.
///
/// # Errors
///
/// Returns an error if the provider cannot be read.
pub async fn load_store_settings(
    provider: &dyn SettingsProvider,
) -> Result<StoreSettings, RepositoryError> {
    let values = provider.get_settings(&keys::ALL).await?;
    Ok(StoreSettings::from_values(&values))
}

/// Settings from the `settings` table.
#[derive(Clone)]
pub struct PgSettings {
    pool: PgPool,
}

impl PgSettings {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every stored setting, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_settings(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl SettingsProvider for PgSettings {
    async fn get_setting(&self, key: &str) -> Result<String, RepositoryError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.unwrap_or_default())
    }

    async fn get_settings(&self, keys: &[&str]) -> Result<HashMap<String, String>, RepositoryError> {
        let wanted: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();

        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM settings WHERE key = ANY($1)",
        )
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await?;

        let mut values: HashMap<String, String> =
            wanted.into_iter().map(|k| (k, String::new())).collect();
        values.extend(rows);
        Ok(values)
    }
}

/// Settings from a fixed map, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<String, String>,
}

impl StaticSettings {
    #[must_use]
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get_setting(&self, key: &str) -> Result<String, RepositoryError> {
        Ok(self.values.get(key).cloned().unwrap_or_default())
    }

    async fn get_settings(&self, keys: &[&str]) -> Result<HashMap<String, String>, RepositoryError> {
        Ok(keys
            .iter()
            .map(|k| {
                (
                    (*k).to_owned(),
                    self.values.get(*k).cloned().unwrap_or_default(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let settings = StaticSettings::default();
        assert_eq!(settings.get_setting(keys::TAX_RATE).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_load_store_settings_applies_fallbacks() {
        let provider = StaticSettings::new([(keys::TAX_RATE, "8"), (keys::SHIPPING_FLAT_RATE, "x")]);
        let settings = load_store_settings(&provider).await.unwrap();

        assert_eq!(settings.tax_rate, Decimal::from(8));
        assert_eq!(settings.shipping_flat_rate, Decimal::ZERO);
        assert_eq!(settings.default_commission_rate, Decimal::TEN);
        assert_eq!(settings.low_stock_threshold, 5);
    }
}
