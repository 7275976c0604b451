//! Status and kind enums for orders, payments, discounts and affiliates.
//!
//! Each enum maps to a Postgres enum type of the same name (with the
//! `postgres` feature) and serializes as `SCREAMING_SNAKE_CASE`, matching the
//! stored labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string did not name a variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Enum being parsed (e.g. "order status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Normalize free-form input before matching enum labels.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle.
///
/// ```text
/// AWAITING_PAYMENT -> PAYMENT_COMPLETE -> ORDER_COMPLETE
///        |                  |
///        +----> CANCELLED <-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    AwaitingPayment,
    PaymentComplete,
    OrderComplete,
    Cancelled,
}

impl OrderStatus {
    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::AwaitingPayment, Self::PaymentComplete | Self::Cancelled)
                | (Self::PaymentComplete, Self::OrderComplete | Self::Cancelled)
        )
    }

    /// `ORDER_COMPLETE` and `CANCELLED` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::OrderComplete | Self::Cancelled)
    }

    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::PaymentComplete => "PAYMENT_COMPLETE",
            Self::OrderComplete => "ORDER_COMPLETE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Human-readable label for customer emails.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "Awaiting payment",
            Self::PaymentComplete => "Payment received",
            Self::OrderComplete => "Complete",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "AWAITING_PAYMENT" => Ok(Self::AwaitingPayment),
            "PAYMENT_COMPLETE" => Ok(Self::PaymentComplete),
            "ORDER_COMPLETE" => Ok(Self::OrderComplete),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError::new("order status", s)),
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Manual payment rails accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Venmo,
    #[cfg_attr(feature = "postgres", sqlx(rename = "CASHAPP"))]
    #[serde(rename = "CASHAPP")]
    CashApp,
    Bitcoin,
}

impl PaymentMethod {
    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Venmo => "VENMO",
            Self::CashApp => "CASHAPP",
            Self::Bitcoin => "BITCOIN",
        }
    }

    /// Human-readable label for customer emails.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Venmo => "Venmo",
            Self::CashApp => "Cash App",
            Self::Bitcoin => "Bitcoin",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "VENMO" => Ok(Self::Venmo),
            "CASHAPP" | "CASH_APP" => Ok(Self::CashApp),
            "BITCOIN" | "BTC" => Ok(Self::Bitcoin),
            _ => Err(ParseStatusError::new("payment method", s)),
        }
    }
}

/// Payment progress. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Submitted,
    Confirmed,
}

impl PaymentStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Submitted => 1,
            Self::Confirmed => 2,
        }
    }

    /// Whether `next` is strictly later in the lifecycle.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// How a coupon's value is applied to the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "discount_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is a currency amount, capped at the subtotal.
    FixedAmount,
}

impl std::str::FromStr for DiscountType {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PERCENTAGE" | "PERCENT" => Ok(Self::Percentage),
            "FIXED_AMOUNT" | "FIXED" => Ok(Self::FixedAmount),
            _ => Err(ParseStatusError::new("discount type", s)),
        }
    }
}

// =============================================================================
// Affiliates
// =============================================================================

/// Affiliate application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "affiliate_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliateStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl AffiliateStatus {
    /// Only approved affiliates attribute discounts or earn commission.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Which tier a commission was paid at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "commission_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    /// Earned by the affiliate the order was attributed to.
    Direct,
    /// Earned by that affiliate's parent.
    Parent,
}

/// Commission payout lifecycle.
///
/// ```text
/// PENDING -> APPROVED -> PAID
///    |          |
///    +-> CANCELLED <-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "commission_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    #[default]
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    /// Whether the payout state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Cancelled)
                | (Self::Approved, Self::Paid | Self::Cancelled)
        )
    }
}

impl std::fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for CommissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError::new("commission status", s)),
        }
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}
