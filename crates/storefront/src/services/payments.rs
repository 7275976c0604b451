//! Manual payment handling and commission accrual.
//!
//! Customers pay outside the store (Venmo, Cash App, Bitcoin) and may record
//! the transaction reference. An admin then confirms the payment, which in
//! one transaction marks the order paid and creates the affiliate
//! commissions it earned.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use orchard_core::pricing::{
    commission_amount, commission_base, resolve_direct_rate, resolve_parent_rate,
};
use orchard_core::{
    CommissionStatus, CommissionType, OrderId, OrderStatus, PaymentStatus, ProductId,
    StoreSettings,
};

use super::notifications::Notifier;
use crate::db::{RepositoryError, Store, StoreTx};
use crate::models::{Commission, CurrentUser, NewCommission, Order, Payment};

/// Errors that can occur while handling payments and order status.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Order does not exist or belongs to someone else.
    #[error("order not found")]
    OrderNotFound,

    /// Order has no payment record.
    #[error("payment not found")]
    PaymentNotFound,

    /// Payment was confirmed before; nothing was changed.
    #[error("payment has already been confirmed")]
    AlreadyConfirmed,

    /// Payment already has a reference or was confirmed.
    #[error("payment is no longer awaiting a transaction reference")]
    PaymentNotPending,

    /// Blank transaction reference.
    #[error("transaction reference is required")]
    MissingTransactionRef,

    /// Order status change not allowed.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Orders become paid only through payment confirmation.
    #[error("confirm the payment to mark an order as paid")]
    ConfirmationRequired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of a payment confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub order: Order,
    pub payment: Payment,
    pub commissions: Vec<Commission>,
}

/// Payment and order-status service.
pub struct PaymentService<S: Store> {
    store: Arc<S>,
    settings: StoreSettings,
    notifier: Arc<dyn Notifier>,
}

impl<S: Store> Clone for PaymentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: Store> PaymentService<S> {
    #[must_use]
    pub fn new(store: Arc<S>, settings: StoreSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            settings,
            notifier,
        }
    }

    /// Record the customer's transaction reference: `PENDING -> SUBMITTED`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::MissingTransactionRef` for a blank reference.
    /// Returns `PaymentError::OrderNotFound` unless `customer` owns the order.
    /// Returns `PaymentError::PaymentNotPending` if the payment has moved on.
    #[instrument(skip(self, customer, transaction_ref), fields(user_id = %customer.id))]
    pub async fn submit_payment(
        &self,
        customer: &CurrentUser,
        order_id: OrderId,
        transaction_ref: &str,
    ) -> Result<Payment, PaymentError> {
        let transaction_ref = transaction_ref.trim();
        if transaction_ref.is_empty() {
            return Err(PaymentError::MissingTransactionRef);
        }

        let mut tx = self.store.begin().await?;

        let order = tx
            .get_order(order_id)
            .await?
            .filter(|order| order.user_id == customer.id)
            .ok_or(PaymentError::OrderNotFound)?;
        if order.status != OrderStatus::AwaitingPayment {
            return Err(PaymentError::PaymentNotPending);
        }

        let payment = tx
            .lock_payment_for_order(order.id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::PaymentNotPending);
        }

        tx.mark_payment_submitted(payment.id, transaction_ref)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => PaymentError::PaymentNotPending,
                other => PaymentError::Repository(other),
            })?;
        let payment = tx
            .payment_for_order(order.id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;
        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, "Payment reference submitted");
        Ok(payment)
    }

    /// Confirm an order's payment and accrue commissions.
    ///
    /// In one transaction: the payment becomes `CONFIRMED`, the order
    /// `PAYMENT_COMPLETE`, and if the order is attributed to an approved
    /// affiliate a `DIRECT` commission is created, plus a `PARENT`
    /// commission when that affiliate has an approved parent.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AlreadyConfirmed` without changing anything if
    /// the payment was confirmed before.
    /// Returns `PaymentError::InvalidTransition` if the order was cancelled.
    /// Returns `PaymentError::Repository` if the store fails; nothing is
    /// written in that case.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn confirm_payment(
        &self,
        order_id: OrderId,
        admin: &CurrentUser,
    ) -> Result<Confirmation, PaymentError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        let payment = tx
            .lock_payment_for_order(order_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        if payment.status == PaymentStatus::Confirmed {
            tx.rollback().await?;
            return Err(PaymentError::AlreadyConfirmed);
        }
        if !order.status.can_transition_to(OrderStatus::PaymentComplete) {
            return Err(PaymentError::InvalidTransition {
                from: order.status,
                to: OrderStatus::PaymentComplete,
            });
        }

        tx.mark_payment_confirmed(payment.id, admin.id, now)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => PaymentError::AlreadyConfirmed,
                other => PaymentError::Repository(other),
            })?;
        tx.set_order_status(order.id, OrderStatus::PaymentComplete)
            .await?;

        let commissions = self.accrue_commissions(&mut tx, &order).await?;

        let customer = tx.get_customer(order.user_id).await?;
        let order = tx
            .get_order(order.id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        let payment = tx
            .payment_for_order(order.id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;
        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            commissions = commissions.len(),
            "Payment confirmed"
        );

        if let Some(customer) = customer {
            self.notifier.notify_customer_status_changed(
                &customer.email,
                &order.order_number,
                order.status,
            );
        }

        Ok(Confirmation {
            order,
            payment,
            commissions,
        })
    }

    async fn accrue_commissions(
        &self,
        tx: &mut S::Tx,
        order: &Order,
    ) -> Result<Vec<Commission>, PaymentError> {
        let Some(affiliate_id) = order.affiliate_id else {
            return Ok(Vec::new());
        };
        let Some(affiliate) = tx
            .get_affiliate(affiliate_id)
            .await?
            .filter(|a| a.is_approved())
        else {
            tracing::info!(%affiliate_id, "Attributed affiliate is not approved, no commission");
            return Ok(Vec::new());
        };

        let base = commission_base(order.subtotal, order.discount_amount);

        let product_ids: Vec<ProductId> = tx
            .order_items(order.id)
            .await?
            .into_iter()
            .filter_map(|item| item.product_id)
            .collect();
        let overrides = tx.category_commission_rates(&product_ids).await?;
        let direct = resolve_direct_rate(&overrides, affiliate.commission_rate, &self.settings);

        let mut commissions = vec![
            tx.insert_commission(&NewCommission {
                affiliate_id: affiliate.id,
                order_id: order.id,
                amount: commission_amount(base, direct.rate),
                rate: direct.rate,
                commission_type: CommissionType::Direct,
            })
            .await?,
        ];
        tracing::debug!(rate = %direct.rate, source = ?direct.source, "Direct commission");

        if let Some(parent_id) = affiliate.parent_id
            && let Some(parent) = tx
                .get_affiliate(parent_id)
                .await?
                .filter(|p| p.is_approved())
        {
            let rate = resolve_parent_rate(&self.settings);
            commissions.push(
                tx.insert_commission(&NewCommission {
                    affiliate_id: parent.id,
                    order_id: order.id,
                    amount: commission_amount(base, rate),
                    rate,
                    commission_type: CommissionType::Parent,
                })
                .await?,
            );
        }

        Ok(commissions)
    }

    /// Move an order along its status machine.
    ///
    /// Cancelling an order also cancels its pending and approved commissions.
    /// Stock is not returned.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::ConfirmationRequired` for `PAYMENT_COMPLETE`.
    /// Returns `PaymentError::InvalidTransition` for any move the status
    /// machine does not allow.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        admin: &CurrentUser,
    ) -> Result<Order, PaymentError> {
        if status == OrderStatus::PaymentComplete {
            return Err(PaymentError::ConfirmationRequired);
        }

        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        if !order.status.can_transition_to(status) {
            return Err(PaymentError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }

        tx.set_order_status(order.id, status).await?;

        if status == OrderStatus::Cancelled {
            for commission in tx.commissions_for_order(order.id).await? {
                if commission
                    .status
                    .can_transition_to(CommissionStatus::Cancelled)
                {
                    tx.set_commission_status(commission.id, CommissionStatus::Cancelled)
                        .await?;
                }
            }
        }

        let customer = tx.get_customer(order.user_id).await?;
        let order = tx
            .get_order(order.id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, %status, "Order status updated");

        if let Some(customer) = customer {
            self.notifier
                .notify_customer_status_changed(&customer.email, &order.order_number, status);
        }

        Ok(order)
    }
}
