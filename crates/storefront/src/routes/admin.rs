//! Admin handlers: payment confirmation and status changes.
//!
//! Every handler requires the admin role.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::{CommissionId, CommissionStatus, OrderId, OrderStatus};

use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Commission, Order};
use crate::services::Confirmation;
use crate::state::AppState;

/// Order status change request body.
#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

/// Commission status change request body.
#[derive(Debug, Deserialize)]
pub struct CommissionStatusRequest {
    pub status: CommissionStatus,
}

/// Confirm the payment of an order and accrue its commissions.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn confirm_payment<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Confirmation>> {
    let confirmation = state.payments().confirm_payment(order_id, &admin).await?;
    Ok(Json(confirmation))
}

/// Move an order along its status machine.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_order_status<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
    Json(request): Json<OrderStatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .payments()
        .update_order_status(order_id, request.status, &admin)
        .await?;
    Ok(Json(order))
}

/// Approve, pay or cancel a commission.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_commission_status<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(commission_id): Path<CommissionId>,
    Json(request): Json<CommissionStatusRequest>,
) -> Result<Json<Commission>> {
    let commission = state
        .commissions()
        .update_status(commission_id, request.status, &admin)
        .await?;
    Ok(Json(commission))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use orchard_core::UserRole;

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, empty_request, json_request, send, user};

    #[tokio::test]
    async fn test_customers_cannot_confirm_payments() {
        let store = MemoryStore::new();
        let customer = store
            .seed(|s| s.add_customer("c@example.com", "C"))
            .await;

        let response = send(
            app(&store, Some(user(customer, UserRole::Customer))),
            empty_request("POST", "/admin/orders/1/confirm-payment"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_guests_cannot_reach_admin_routes() {
        let store = MemoryStore::new();

        let response = send(
            app(&store, None),
            json_request(
                "POST",
                "/admin/commissions/1/status",
                &json!({ "status": "APPROVED" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_payment_complete_needs_confirmation_endpoint() {
        let store = MemoryStore::new();
        let admin = store
            .seed(|s| s.add_customer("admin@example.com", "Admin"))
            .await;

        let response = send(
            app(&store, Some(user(admin, UserRole::Admin))),
            json_request(
                "POST",
                "/admin/orders/1/status",
                &json!({ "status": "PAYMENT_COMPLETE" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_confirming_unknown_order_is_not_found() {
        let store = MemoryStore::new();
        let admin = store
            .seed(|s| s.add_customer("admin@example.com", "Admin"))
            .await;

        let response = send(
            app(&store, Some(user(admin, UserRole::Admin))),
            empty_request("POST", "/admin/orders/77/confirm-payment"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
