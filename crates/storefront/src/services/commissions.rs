//! Commission payout status.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use orchard_core::{CommissionId, CommissionStatus};

use crate::db::{RepositoryError, Store, StoreTx};
use crate::models::{Commission, CurrentUser};

/// Errors that can occur when updating a commission.
#[derive(Debug, Error)]
pub enum CommissionError {
    #[error("commission not found")]
    NotFound,

    #[error("cannot move commission from {from} to {to}")]
    InvalidTransition {
        from: CommissionStatus,
        to: CommissionStatus,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Admin operations on commissions.
pub struct CommissionService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for CommissionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> CommissionService<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Approve, pay or cancel a commission.
    ///
    /// # Errors
    ///
    /// Returns `CommissionError::NotFound` if there is no such commission.
    /// Returns `CommissionError::InvalidTransition` unless the payout state
    /// machine allows the move.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn update_status(
        &self,
        id: CommissionId,
        status: CommissionStatus,
        admin: &CurrentUser,
    ) -> Result<Commission, CommissionError> {
        let mut tx = self.store.begin().await?;

        let commission = tx
            .lock_commission(id)
            .await?
            .ok_or(CommissionError::NotFound)?;
        if !commission.status.can_transition_to(status) {
            return Err(CommissionError::InvalidTransition {
                from: commission.status,
                to: status,
            });
        }

        tx.set_commission_status(id, status).await?;
        let commission = tx
            .lock_commission(id)
            .await?
            .ok_or(CommissionError::NotFound)?;
        tx.commit().await?;

        tracing::info!(%id, %status, "Commission status updated");
        Ok(commission)
    }
}
