//! Discount lookups inside a store transaction.
//!
//! The decision itself lives in [`orchard_core::pricing::discount`]; this
//! module fetches the coupon and affiliates the shopper's codes name, using
//! the caller's transaction so the coupon row stays locked until it commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use orchard_core::pricing::{
    AppliedDiscount, CodeRejection, Coupon, CouponUnavailable, DiscountCodes, DiscountLookups,
    DiscountSource, check_entered_code, resolve_discount,
};

use crate::db::{RepositoryError, StoreTx};
use crate::models::Affiliate;

/// Coupon and affiliates found for a set of codes.
#[derive(Debug, Clone, Default)]
pub struct FoundDiscounts {
    coupon: Option<Coupon>,
    code_affiliate: Option<Affiliate>,
    cookie_affiliate: Option<Affiliate>,
}

impl FoundDiscounts {
    /// Look up everything `codes` can resolve to.
    ///
    /// The coupon named by the code to check is locked for the rest of `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub async fn load<T: StoreTx>(
        tx: &mut T,
        codes: &DiscountCodes,
    ) -> Result<Self, RepositoryError> {
        let mut found = Self::default();

        if let Some(code) = codes.code_to_check() {
            found.coupon = tx.lock_coupon_by_code(code).await?;
            found.code_affiliate = tx.find_approved_affiliate_by_code(code).await?;
        }
        if let Some(cookie) = codes.fallback_cookie_code() {
            found.cookie_affiliate = tx.find_approved_affiliate_by_code(cookie).await?;
        }

        Ok(found)
    }

    #[must_use]
    pub fn lookups(&self) -> DiscountLookups<'_> {
        DiscountLookups {
            coupon: self.coupon.as_ref(),
            code_affiliate: self.code_affiliate.as_ref().map(|a| a.id),
            cookie_affiliate: self.cookie_affiliate.as_ref().map(|a| a.id),
        }
    }

    /// Pick the discount for `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponUnavailable`] when an entered coupon no longer applies.
    pub fn resolve(
        &self,
        subtotal: Decimal,
        codes: &DiscountCodes,
        affiliate_discount_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AppliedDiscount, CouponUnavailable> {
        resolve_discount(subtotal, codes, self.lookups(), affiliate_discount_rate, now)
    }

    /// Entry-time check of a single typed code (already normalized).
    ///
    /// # Errors
    ///
    /// Returns [`CodeRejection`] if the code is neither an eligible coupon nor
    /// an approved referral code.
    pub fn check_entered(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<DiscountSource, CodeRejection> {
        check_entered_code(
            code,
            subtotal,
            self.coupon.as_ref(),
            self.code_affiliate.as_ref().map(|a| a.id),
            now,
        )
    }
}
