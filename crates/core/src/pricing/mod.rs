//! Pricing rules: coupons, discount precedence, totals and commissions.
//!
//! Everything here is pure. Lookups and persistence happen in the storefront
//! crate, inside its transactions, and feed these functions.

pub mod commission;
pub mod coupon;
pub mod discount;
pub mod totals;

pub use commission::{
    RateSource, ResolvedRate, commission_amount, commission_base, resolve_direct_rate,
    resolve_parent_rate,
};
pub use coupon::{Coupon, CouponRejection};
pub use discount::{
    AppliedDiscount, CodeRejection, CouponUnavailable, DiscountCodes, DiscountLookups,
    DiscountSource, check_entered_code, normalize_code, resolve_discount,
};
pub use totals::OrderTotals;
