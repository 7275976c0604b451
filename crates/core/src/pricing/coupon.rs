//! Coupons and their eligibility rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{percent_of, round_cents};
use crate::types::{CouponId, DiscountType};

/// Why a coupon cannot be applied right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("order subtotal must be at least {minimum}")]
    BelowMinimum {
        /// Minimum subtotal the coupon requires.
        minimum: Decimal,
    },
}

/// A discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Always stored uppercased.
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub active: bool,
}

impl Coupon {
    /// Check every constraint against `subtotal` at instant `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing constraint: active flag, start, expiry,
    /// usage cap, then minimum order amount.
    pub fn check_eligibility(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), CouponRejection> {
        if !self.active {
            return Err(CouponRejection::Inactive);
        }
        if self.starts_at.is_some_and(|starts| starts > now) {
            return Err(CouponRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|expires| expires <= now) {
            return Err(CouponRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(CouponRejection::UsageLimitReached);
        }
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(CouponRejection::BelowMinimum { minimum });
        }
        Ok(())
    }

    /// Whether the usage cap has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }

    /// Discount this coupon grants on `subtotal`, rounded to cents and never
    /// more than the subtotal.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => percent_of(subtotal, self.discount_value),
            DiscountType::FixedAmount => self.discount_value.min(subtotal),
        };
        round_cents(raw.max(Decimal::ZERO).min(subtotal))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;

    pub(crate) fn percentage(code: &str, value: i64) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: code.to_owned(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(value),
            starts_at: None,
            expires_at: None,
            min_order_amount: None,
            max_uses: None,
            used_count: 0,
            active: true,
        }
    }

    #[test]
    fn test_unconstrained_coupon_is_eligible() {
        let coupon = percentage("SAVE20", 20);
        assert!(coupon.check_eligibility(Decimal::from(100), Utc::now()).is_ok());
    }

    #[test]
    fn test_inactive_coupon_rejected() {
        let mut coupon = percentage("SAVE20", 20);
        coupon.active = false;
        assert_eq!(
            coupon.check_eligibility(Decimal::from(100), Utc::now()),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn test_window_is_enforced() {
        let now = Utc::now();
        let mut coupon = percentage("SAVE20", 20);

        coupon.starts_at = Some(now + Duration::hours(1));
        assert_eq!(
            coupon.check_eligibility(Decimal::from(100), now),
            Err(CouponRejection::NotStarted)
        );

        coupon.starts_at = Some(now - Duration::hours(2));
        coupon.expires_at = Some(now - Duration::hours(1));
        assert_eq!(
            coupon.check_eligibility(Decimal::from(100), now),
            Err(CouponRejection::Expired)
        );

        coupon.expires_at = Some(now + Duration::hours(1));
        assert!(coupon.check_eligibility(Decimal::from(100), now).is_ok());
    }

    #[test]
    fn test_usage_cap_is_enforced() {
        let mut coupon = percentage("ONCE", 10);
        coupon.max_uses = Some(1);
        assert!(coupon.check_eligibility(Decimal::from(10), Utc::now()).is_ok());

        coupon.used_count = 1;
        assert_eq!(
            coupon.check_eligibility(Decimal::from(10), Utc::now()),
            Err(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_minimum_order_amount() {
        let mut coupon = percentage("BIG", 10);
        coupon.min_order_amount = Some(Decimal::from(50));
        assert_eq!(
            coupon.check_eligibility(Decimal::new(4999, 2), Utc::now()),
            Err(CouponRejection::BelowMinimum {
                minimum: Decimal::from(50)
            })
        );
        assert!(coupon.check_eligibility(Decimal::from(50), Utc::now()).is_ok());
    }

    #[test]
    fn test_percentage_discount() {
        let coupon = percentage("SAVE20", 20);
        assert_eq!(coupon.discount_for(Decimal::from(100)), Decimal::new(2000, 2));
        assert_eq!(coupon.discount_for(Decimal::new(3333, 2)), Decimal::new(667, 2));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let mut coupon = percentage("TENOFF", 10);
        coupon.discount_type = DiscountType::FixedAmount;
        assert_eq!(coupon.discount_for(Decimal::from(50)), Decimal::from(10));
        assert_eq!(coupon.discount_for(Decimal::new(799, 2)), Decimal::new(799, 2));
    }
}
