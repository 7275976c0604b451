//! Order total computation.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::money::{clamp_to, percent_of, round_cents};
use crate::settings::StoreSettings;

/// Money breakdown of an order.
///
/// ```text
/// discounted_subtotal = subtotal - discount
/// tax                 = discounted_subtotal × tax_rate / 100
/// total               = discounted_subtotal + tax + shipping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub discounted_subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals from a subtotal and a resolved discount.
    ///
    /// The discount is clamped to `[0, subtotal]` so the taxable amount is
    /// never negative. Tax is rounded half-up to cents.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount: Decimal, settings: &StoreSettings) -> Self {
        let subtotal = round_cents(subtotal.max(Decimal::ZERO));
        let discount = round_cents(clamp_to(discount, subtotal));
        let discounted_subtotal = subtotal - discount;
        let tax = round_cents(percent_of(discounted_subtotal, settings.tax_rate));
        let shipping = round_cents(settings.shipping_flat_rate);

        Self {
            subtotal,
            discount,
            discounted_subtotal,
            tax,
            shipping,
            total: discounted_subtotal + tax + shipping,
        }
    }
}

/// Sum of `unit_price × quantity` over lines.
#[must_use]
pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    round_cents(
        lines
            .into_iter()
            .map(|(price, quantity)| price * Decimal::from(quantity))
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tax: i64, shipping: i64) -> StoreSettings {
        StoreSettings {
            tax_rate: Decimal::from(tax),
            shipping_flat_rate: Decimal::from(shipping),
            ..StoreSettings::default()
        }
    }

    #[test]
    fn test_coupon_example() {
        let totals = OrderTotals::compute(Decimal::from(100), Decimal::from(20), &settings(8, 5));

        assert_eq!(totals.discount, Decimal::new(2000, 2));
        assert_eq!(totals.discounted_subtotal, Decimal::new(8000, 2));
        assert_eq!(totals.tax, Decimal::new(640, 2));
        assert_eq!(totals.shipping, Decimal::from(5));
        assert_eq!(totals.total, Decimal::new(9140, 2));
    }

    #[test]
    fn test_discount_larger_than_subtotal_is_clamped() {
        let totals = OrderTotals::compute(Decimal::from(30), Decimal::from(45), &settings(8, 5));

        assert_eq!(totals.discount, Decimal::from(30));
        assert_eq!(totals.discounted_subtotal, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::from(5));
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10.50 × 5% = 0.525
        let totals =
            OrderTotals::compute(Decimal::new(1050, 2), Decimal::ZERO, &settings(5, 0));
        assert_eq!(totals.tax, Decimal::new(53, 2));
    }

    #[test]
    fn test_subtotal_of_lines() {
        let lines = [(Decimal::new(1999, 2), 2), (Decimal::new(500, 2), 3)];
        assert_eq!(subtotal(lines), Decimal::new(5498, 2));
    }
}
