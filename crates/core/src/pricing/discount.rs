//! Discount resolution: coupon versus affiliate referral.
//!
//! The decision is split from the lookups. A caller normalizes the shopper's
//! codes with [`DiscountCodes`], looks up the coupon and affiliates those codes
//! name (inside whatever transaction it is running), then hands the results
//! to [`resolve_discount`].
//!
//! Precedence:
//!
//! 1. The code to check is the manually entered code if present, otherwise
//!    the referral cookie. Both are uppercased.
//! 2. Attribution: the approved affiliate whose referral code is the code to
//!    check; failing that, the affiliate named by a distinct cookie code.
//!    Attribution is independent of which discount applies, so a shopper who
//!    types a coupon can still be attributed through their cookie.
//! 3. A valid coupon matching the code to check supplies the discount.
//! 4. Otherwise, if the code to check is an approved affiliate's referral
//!    code, the affiliate discount rate applies.
//! 5. Coupon and affiliate discounts never stack.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::coupon::{Coupon, CouponRejection};
use crate::money::{clamp_to, percent_of, round_cents};
use crate::types::{AffiliateId, CouponId};

/// Shopper-supplied codes, trimmed and uppercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscountCodes {
    entered: Option<String>,
    cookie: Option<String>,
}

impl DiscountCodes {
    /// Normalize an entered code and a referral-cookie code. Blank values are
    /// treated as absent.
    #[must_use]
    pub fn new(entered: Option<&str>, cookie: Option<&str>) -> Self {
        Self {
            entered: normalize_code(entered),
            cookie: normalize_code(cookie),
        }
    }

    /// The manually entered code.
    #[must_use]
    pub fn entered(&self) -> Option<&str> {
        self.entered.as_deref()
    }

    /// The referral-cookie code.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Entered code if present, else the cookie code.
    #[must_use]
    pub fn code_to_check(&self) -> Option<&str> {
        self.entered().or_else(|| self.cookie())
    }

    /// The cookie code, when it differs from the code to check and so needs
    /// its own attribution lookup.
    #[must_use]
    pub fn fallback_cookie_code(&self) -> Option<&str> {
        match (self.code_to_check(), self.cookie()) {
            (Some(checked), Some(cookie)) if checked != cookie => Some(cookie),
            _ => None,
        }
    }
}

/// Uppercase and trim a code; blank becomes `None`.
#[must_use]
pub fn normalize_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
}

/// What the lookups for a [`DiscountCodes`] found.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountLookups<'a> {
    /// Coupon whose code equals the code to check, valid or not.
    pub coupon: Option<&'a Coupon>,
    /// Approved affiliate whose referral code equals the code to check.
    pub code_affiliate: Option<AffiliateId>,
    /// Approved affiliate named by the fallback cookie code.
    pub cookie_affiliate: Option<AffiliateId>,
}

/// Where an order's discount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    None,
    Coupon,
    Affiliate,
}

/// Outcome of discount resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    /// Discount in currency, rounded to cents, within `[0, subtotal]`.
    pub amount: Decimal,
    /// Code shown on the order, if any discount applied.
    pub applied_code: Option<String>,
    /// Affiliate the order is attributed to (independent of `source`).
    pub affiliate_id: Option<AffiliateId>,
    /// Coupon whose usage must be counted, if a coupon applied.
    pub coupon_id: Option<CouponId>,
    pub source: DiscountSource,
}

impl AppliedDiscount {
    /// No discount, optionally still attributed to an affiliate.
    #[must_use]
    pub const fn none(affiliate_id: Option<AffiliateId>) -> Self {
        Self {
            amount: Decimal::ZERO,
            applied_code: None,
            affiliate_id,
            coupon_id: None,
            source: DiscountSource::None,
        }
    }
}

/// A manually entered coupon failed re-validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("coupon {code} can no longer be applied: {reason}")]
pub struct CouponUnavailable {
    pub code: String,
    pub reason: CouponRejection,
}

/// Pick the single discount that applies to `subtotal`.
///
/// # Errors
///
/// Returns [`CouponUnavailable`] when the shopper typed a code that names an
/// existing coupon which is no longer eligible and which is not also an
/// approved referral code. Codes arriving only through the referral cookie
/// never fail checkout; they just stop discounting.
pub fn resolve_discount(
    subtotal: Decimal,
    codes: &DiscountCodes,
    lookups: DiscountLookups<'_>,
    affiliate_discount_rate: Decimal,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, CouponUnavailable> {
    let affiliate_id = lookups.code_affiliate.or(lookups.cookie_affiliate);

    let Some(code) = codes.code_to_check() else {
        return Ok(AppliedDiscount::none(affiliate_id));
    };

    if let Some(coupon) = lookups.coupon {
        match coupon.check_eligibility(subtotal, now) {
            Ok(()) => {
                return Ok(AppliedDiscount {
                    amount: clamp_to(coupon.discount_for(subtotal), subtotal),
                    applied_code: Some(code.to_owned()),
                    affiliate_id,
                    coupon_id: Some(coupon.id),
                    source: DiscountSource::Coupon,
                });
            }
            Err(reason) if lookups.code_affiliate.is_none() && codes.entered().is_some() => {
                return Err(CouponUnavailable {
                    code: code.to_owned(),
                    reason,
                });
            }
            Err(_) => {}
        }
    }

    if lookups.code_affiliate.is_some() {
        let amount = round_cents(percent_of(subtotal, affiliate_discount_rate));
        return Ok(AppliedDiscount {
            amount: clamp_to(amount, subtotal),
            applied_code: Some(code.to_owned()),
            affiliate_id,
            coupon_id: None,
            source: DiscountSource::Affiliate,
        });
    }

    Ok(AppliedDiscount::none(affiliate_id))
}

/// Why a code typed at the discount field was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeRejection {
    #[error("{0} is not a valid discount or referral code")]
    Unknown(String),
    #[error("{code}: {reason}")]
    Coupon {
        code: String,
        reason: CouponRejection,
    },
}

/// Entry-time check for a code the shopper just typed.
///
/// A code is accepted if it is an eligible coupon for `subtotal`, or the
/// referral code of an approved affiliate.
///
/// # Errors
///
/// Returns [`CodeRejection`] describing why the code was refused.
pub fn check_entered_code(
    code: &str,
    subtotal: Decimal,
    coupon: Option<&Coupon>,
    affiliate: Option<AffiliateId>,
    now: DateTime<Utc>,
) -> Result<DiscountSource, CodeRejection> {
    match coupon.map(|c| c.check_eligibility(subtotal, now)) {
        Some(Ok(())) => Ok(DiscountSource::Coupon),
        _ if affiliate.is_some() => Ok(DiscountSource::Affiliate),
        Some(Err(reason)) => Err(CodeRejection::Coupon {
            code: code.to_owned(),
            reason,
        }),
        None => Err(CodeRejection::Unknown(code.to_owned())),
    }
}
