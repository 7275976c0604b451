//! Currency arithmetic on `Decimal` amounts.
//!
//! Amounts are dollars with two decimal places. Rates are percentages, so a
//! rate of `8` means 8%. Rounding is half-up on cents
//! (`MidpointAwayFromZero`), which for the non-negative amounts used here is
//! ordinary commercial rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every stored amount.
pub const CENT_SCALE: u32 = 2;

/// Round an amount to whole cents, half-up.
///
/// ```
/// use orchard_core::money::round_cents;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_cents(Decimal::new(10_005, 3)), Decimal::new(1_001, 2));
/// assert_eq!(round_cents(Decimal::new(10_004, 3)), Decimal::new(1_000, 2));
/// ```
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × rate / 100`, unrounded.
#[must_use]
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

/// Clamp `amount` into `[0, ceiling]`.
#[must_use]
pub fn clamp_to(amount: Decimal, ceiling: Decimal) -> Decimal {
    amount.max(Decimal::ZERO).min(ceiling.max(Decimal::ZERO))
}

/// Format an amount as US dollars, e.g. `$91.40`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents_half_up() {
        assert_eq!(round_cents(Decimal::new(1_2345, 4)), Decimal::new(123, 2));
        assert_eq!(round_cents(Decimal::new(1_2350, 4)), Decimal::new(124, 2));
        assert_eq!(round_cents(Decimal::new(25, 3)), Decimal::new(3, 2));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(Decimal::from(80), Decimal::from(8)), Decimal::new(640, 2));
        assert_eq!(
            percent_of(Decimal::from(45), Decimal::from(12)),
            Decimal::new(540, 2)
        );
    }

    #[test]
    fn test_clamp_to() {
        assert_eq!(clamp_to(Decimal::from(120), Decimal::from(100)), Decimal::from(100));
        assert_eq!(clamp_to(Decimal::from(-3), Decimal::from(100)), Decimal::ZERO);
        assert_eq!(clamp_to(Decimal::from(30), Decimal::from(100)), Decimal::from(30));
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(Decimal::new(9140, 2)), "$91.40");
        assert_eq!(format_usd(Decimal::from(5)), "$5.00");
        assert_eq!(format_usd(Decimal::new(-25, 1)), "-$2.50");
    }
}
