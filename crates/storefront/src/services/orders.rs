//! Read access to placed orders.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use orchard_core::OrderId;

use crate::db::{RepositoryError, Store, StoreTx};
use crate::models::{CurrentUser, Order, OrderItem, Payment};

/// An order with its frozen items and payment.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

/// Order lookups for customers and admins.
pub struct OrderService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> OrderService<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The viewer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.id))]
    pub async fn list_for(&self, viewer: &CurrentUser) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = self.store.begin().await?;
        let orders = tx.orders_for_user(viewer.id).await?;
        tx.rollback().await?;
        Ok(orders)
    }

    /// One order, visible to its owner and to admins.
    ///
    /// Returns `Ok(None)` both for missing orders and for orders the viewer
    /// may not see.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.id))]
    pub async fn detail(
        &self,
        viewer: &CurrentUser,
        id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut tx = self.store.begin().await?;

        let Some(order) = tx
            .get_order(id)
            .await?
            .filter(|order| order.user_id == viewer.id || viewer.is_admin())
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let items = tx.order_items(order.id).await?;
        let payment = tx.payment_for_order(order.id).await?;
        tx.rollback().await?;

        Ok(Some(OrderDetail {
            order,
            items,
            payment,
        }))
    }
}
