//! Typed store configuration.
//!
//! The settings store is an opaque string-to-string map. [`StoreSettings`]
//! parses the keys the checkout and commission pipeline reads, applying a
//! documented fallback whenever a key is missing or unparsable, so callers
//! never deal with raw strings.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settings keys read by the pipeline.
pub mod keys {
    /// Sales tax percentage applied to the discounted subtotal.
    pub const TAX_RATE: &str = "tax_rate";
    /// Flat shipping charge per order.
    pub const SHIPPING_FLAT_RATE: &str = "shipping_flat_rate";
    /// Direct commission percentage when no override or personal rate applies.
    pub const DEFAULT_COMMISSION_RATE: &str = "default_commission_rate";
    /// Discount percentage granted to shoppers referred by an affiliate.
    pub const AFFILIATE_DISCOUNT_RATE: &str = "affiliate_discount_rate";
    /// Commission percentage paid to a referring affiliate's parent.
    pub const PARENT_COMMISSION_RATE: &str = "parent_commission_rate";
    /// Remaining stock at or below which a low-stock alert fires.
    pub const LOW_STOCK_THRESHOLD: &str = "low_stock_threshold";

    /// Every key, in the order they are documented.
    pub const ALL: [&str; 6] = [
        TAX_RATE,
        SHIPPING_FLAT_RATE,
        DEFAULT_COMMISSION_RATE,
        AFFILIATE_DISCOUNT_RATE,
        PARENT_COMMISSION_RATE,
        LOW_STOCK_THRESHOLD,
    ];
}

/// Fallback tax rate (percent).
pub const FALLBACK_TAX_RATE: Decimal = Decimal::ZERO;
/// Fallback flat shipping charge.
pub const FALLBACK_SHIPPING_FLAT_RATE: Decimal = Decimal::ZERO;
/// Fallback direct commission rate (percent).
pub const FALLBACK_DEFAULT_COMMISSION_RATE: Decimal = Decimal::TEN;
/// Fallback affiliate referral discount rate (percent).
pub const FALLBACK_AFFILIATE_DISCOUNT_RATE: Decimal = Decimal::TEN;
/// Fallback parent commission rate (percent).
pub const FALLBACK_PARENT_COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Fallback low-stock threshold (units).
pub const FALLBACK_LOW_STOCK_THRESHOLD: i32 = 5;

/// Configuration consumed by checkout and commission accrual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub tax_rate: Decimal,
    pub shipping_flat_rate: Decimal,
    pub default_commission_rate: Decimal,
    pub affiliate_discount_rate: Decimal,
    pub parent_commission_rate: Decimal,
    pub low_stock_threshold: i32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            tax_rate: FALLBACK_TAX_RATE,
            shipping_flat_rate: FALLBACK_SHIPPING_FLAT_RATE,
            default_commission_rate: FALLBACK_DEFAULT_COMMISSION_RATE,
            affiliate_discount_rate: FALLBACK_AFFILIATE_DISCOUNT_RATE,
            parent_commission_rate: FALLBACK_PARENT_COMMISSION_RATE,
            low_stock_threshold: FALLBACK_LOW_STOCK_THRESHOLD,
        }
    }
}

impl StoreSettings {
    /// Build settings from raw key-value pairs.
    ///
    /// Missing keys, empty strings, unparsable numbers and negative values all
    /// fall back to the documented constant for that key.
    #[must_use]
    pub fn from_values(values: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        Self {
            tax_rate: decimal_or(values, keys::TAX_RATE, defaults.tax_rate),
            shipping_flat_rate: decimal_or(
                values,
                keys::SHIPPING_FLAT_RATE,
                defaults.shipping_flat_rate,
            ),
            default_commission_rate: decimal_or(
                values,
                keys::DEFAULT_COMMISSION_RATE,
                defaults.default_commission_rate,
            ),
            affiliate_discount_rate: decimal_or(
                values,
                keys::AFFILIATE_DISCOUNT_RATE,
                defaults.affiliate_discount_rate,
            ),
            parent_commission_rate: decimal_or(
                values,
                keys::PARENT_COMMISSION_RATE,
                defaults.parent_commission_rate,
            ),
            low_stock_threshold: values
                .get(keys::LOW_STOCK_THRESHOLD)
                .and_then(|raw| raw.trim().parse::<i32>().ok())
                .filter(|threshold| *threshold >= 0)
                .unwrap_or(defaults.low_stock_threshold),
        }
    }
}

fn decimal_or(values: &HashMap<String, String>, key: &str, fallback: Decimal) -> Decimal {
    values
        .get(key)
        .and_then(|raw| raw.trim().parse::<Decimal>().ok())
        .filter(|value| !value.is_sign_negative())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_empty_store_uses_fallbacks() {
        let settings = StoreSettings::from_values(&HashMap::new());
        assert_eq!(settings, StoreSettings::default());
        assert_eq!(settings.parent_commission_rate, Decimal::from(5));
    }

    #[test]
    fn test_parses_configured_values() {
        let settings = StoreSettings::from_values(&values(&[
            (keys::TAX_RATE, "8"),
            (keys::SHIPPING_FLAT_RATE, "5.00"),
            (keys::DEFAULT_COMMISSION_RATE, "8"),
            (keys::AFFILIATE_DISCOUNT_RATE, "12.5"),
            (keys::PARENT_COMMISSION_RATE, "3"),
            (keys::LOW_STOCK_THRESHOLD, "2"),
        ]));

        assert_eq!(settings.tax_rate, Decimal::from(8));
        assert_eq!(settings.shipping_flat_rate, Decimal::new(500, 2));
        assert_eq!(settings.default_commission_rate, Decimal::from(8));
        assert_eq!(settings.affiliate_discount_rate, Decimal::new(125, 1));
        assert_eq!(settings.parent_commission_rate, Decimal::from(3));
        assert_eq!(settings.low_stock_threshold, 2);
    }

    #[test]
    fn test_blank_and_garbage_values_fall_back() {
        let settings = StoreSettings::from_values(&values(&[
            (keys::TAX_RATE, ""),
            (keys::SHIPPING_FLAT_RATE, "free"),
            (keys::AFFILIATE_DISCOUNT_RATE, "-4"),
            (keys::LOW_STOCK_THRESHOLD, "lots"),
        ]));

        assert_eq!(settings.tax_rate, FALLBACK_TAX_RATE);
        assert_eq!(settings.shipping_flat_rate, FALLBACK_SHIPPING_FLAT_RATE);
        assert_eq!(
            settings.affiliate_discount_rate,
            FALLBACK_AFFILIATE_DISCOUNT_RATE
        );
        assert_eq!(settings.low_stock_threshold, FALLBACK_LOW_STOCK_THRESHOLD);
    }
}
