//! Affiliates and the commissions they earn.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use orchard_core::{
    AffiliateId, AffiliateStatus, CommissionId, CommissionStatus, CommissionType, OrderId,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Affiliate {
    pub id: AffiliateId,
    pub user_id: UserId,
    /// Referral code, stored uppercased.
    pub code: String,
    /// Personal commission rate in percent; the store default applies when unset.
    pub commission_rate: Option<Decimal>,
    pub status: AffiliateStatus,
    pub parent_id: Option<AffiliateId>,
}

impl Affiliate {
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        self.status.is_approved()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Commission {
    pub id: CommissionId,
    pub affiliate_id: AffiliateId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub rate: Decimal,
    pub commission_type: CommissionType,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Commission to insert; always starts `PENDING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommission {
    pub affiliate_id: AffiliateId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub rate: Decimal,
    pub commission_type: CommissionType,
}
