//! Affiliate commission rates and amounts.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::money::{percent_of, round_cents};
use crate::settings::StoreSettings;

/// Which rule produced a direct commission rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Highest category override among the order's products.
    CategoryOverride,
    /// The affiliate's personal rate.
    Affiliate,
    /// Store-wide default.
    StoreDefault,
}

/// A resolved commission rate (percent) and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRate {
    pub rate: Decimal,
    pub source: RateSource,
}

/// Rate for the affiliate an order is attributed to.
///
/// Strict priority, each step short-circuiting the next:
/// 1. the maximum of every category override on the order's products,
/// 2. the affiliate's personal rate,
/// 3. the store default from settings.
#[must_use]
pub fn resolve_direct_rate(
    category_overrides: &[Decimal],
    affiliate_rate: Option<Decimal>,
    settings: &StoreSettings,
) -> ResolvedRate {
    if let Some(rate) = category_overrides.iter().copied().max() {
        return ResolvedRate {
            rate,
            source: RateSource::CategoryOverride,
        };
    }

    affiliate_rate.map_or(
        ResolvedRate {
            rate: settings.default_commission_rate,
            source: RateSource::StoreDefault,
        },
        |rate| ResolvedRate {
            rate,
            source: RateSource::Affiliate,
        },
    )
}

/// Rate for the parent of the attributed affiliate. Parents never inherit
/// category overrides.
#[must_use]
pub const fn resolve_parent_rate(settings: &StoreSettings) -> Decimal {
    settings.parent_commission_rate
}

/// Amount commissions are computed on: subtotal less discount, excluding tax
/// and shipping. Never negative.
#[must_use]
pub fn commission_base(subtotal: Decimal, discount: Decimal) -> Decimal {
    (subtotal - discount).max(Decimal::ZERO)
}

/// `base × rate / 100`, rounded half-up to cents.
#[must_use]
pub fn commission_amount(base: Decimal, rate: Decimal) -> Decimal {
    round_cents(percent_of(base, rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(default: i64, parent: i64) -> StoreSettings {
        StoreSettings {
            default_commission_rate: Decimal::from(default),
            parent_commission_rate: Decimal::from(parent),
            ..StoreSettings::default()
        }
    }

    #[test]
    fn test_category_override_beats_affiliate_and_default() {
        let resolved = resolve_direct_rate(
            &[Decimal::from(15)],
            Some(Decimal::from(10)),
            &settings(8, 5),
        );
        assert_eq!(resolved.rate, Decimal::from(15));
        assert_eq!(resolved.source, RateSource::CategoryOverride);
    }

    #[test]
    fn test_multiple_overrides_take_the_maximum() {
        let resolved = resolve_direct_rate(
            &[Decimal::from(6), Decimal::new(175, 1), Decimal::from(12)],
            Some(Decimal::from(20)),
            &settings(8, 5),
        );
        assert_eq!(resolved.rate, Decimal::new(175, 1));
    }

    #[test]
    fn test_affiliate_rate_without_overrides() {
        let resolved = resolve_direct_rate(&[], Some(Decimal::from(12)), &settings(8, 5));
        assert_eq!(resolved.rate, Decimal::from(12));
        assert_eq!(resolved.source, RateSource::Affiliate);
    }

    #[test]
    fn test_store_default_last() {
        let resolved = resolve_direct_rate(&[], None, &settings(8, 5));
        assert_eq!(resolved.rate, Decimal::from(8));
        assert_eq!(resolved.source, RateSource::StoreDefault);
    }

    #[test]
    fn test_parent_rate_ignores_overrides() {
        assert_eq!(resolve_parent_rate(&settings(8, 5)), Decimal::from(5));
    }

    #[test]
    fn test_affiliate_example() {
        let base = commission_base(Decimal::from(50), Decimal::from(5));
        assert_eq!(base, Decimal::from(45));
        assert_eq!(commission_amount(base, Decimal::from(12)), Decimal::new(540, 2));
    }

    #[test]
    fn test_base_never_negative() {
        assert_eq!(commission_base(Decimal::from(5), Decimal::from(9)), Decimal::ZERO);
    }
}
