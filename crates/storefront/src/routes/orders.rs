//! Customer order handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::OrderId;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, Payment};
use crate::services::OrderDetail;
use crate::state::AppState;

/// Payment submission request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    pub transaction_ref: String,
}

/// Order history, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_for(&user).await?;
    Ok(Json(orders))
}

/// One order with its items and payment.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    state
        .orders()
        .detail(&user, order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
}

/// Record the transaction reference the customer paid with.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn submit_payment<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    Json(request): Json<SubmitPaymentRequest>,
) -> Result<Json<Payment>> {
    let payment = state
        .payments()
        .submit_payment(&user, order_id, &request.transaction_ref)
        .await?;
    Ok(Json(payment))
}
