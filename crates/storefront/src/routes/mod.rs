//! HTTP route handlers for the storefront.
//!
//! Every handler speaks JSON. Errors come back as `{"error": "..."}` with the
//! status chosen by [`AppError`](crate::error::AppError).
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                            - Liveness
//! GET    /health/ready                      - Readiness (store reachable)
//!
//! # Referrals
//! GET    /ref/{code}                        - Remember referral code, redirect home
//!
//! # Cart (guest or signed in)
//! GET    /cart                              - Priced cart
//! POST   /cart/items                        - Add item (creates guest cart cookie)
//! PATCH  /cart/items/{id}                   - Set quantity
//! DELETE /cart/items/{id}                   - Remove item
//! POST   /cart/merge                        - Fold guest cart into user cart (auth)
//!
//! # Checkout
//! POST   /checkout/code                     - Check a discount code as typed
//! POST   /checkout/quote                    - Totals preview
//! POST   /checkout                          - Place order (auth)
//!
//! # Orders (auth)
//! GET    /orders                            - Order history
//! GET    /orders/{id}                       - Order detail
//! POST   /orders/{id}/payment               - Submit transaction reference
//!
//! # Admin (admin role)
//! POST   /admin/orders/{id}/confirm-payment - Confirm payment, accrue commissions
//! POST   /admin/orders/{id}/status          - Move order status
//! POST   /admin/commissions/{id}/status     - Move commission status
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod referral;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::db::Store;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>))
        .route("/items", post(cart::add::<S>))
        .route(
            "/items/{id}",
            patch(cart::update::<S>).delete(cart::remove::<S>),
        )
        .route("/merge", post(cart::merge::<S>))
}

/// Create the checkout routes router.
pub fn checkout_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(checkout::place_order::<S>))
        .route("/code", post(checkout::validate_code::<S>))
        .route("/quote", post(checkout::quote::<S>))
}

/// Create the order routes router.
pub fn order_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>))
        .route("/{id}", get(orders::show::<S>))
        .route("/{id}/payment", post(orders::submit_payment::<S>))
}

/// Create the admin routes router.
pub fn admin_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/orders/{id}/confirm-payment",
            post(admin::confirm_payment::<S>),
        )
        .route("/orders/{id}/status", post(admin::update_order_status::<S>))
        .route(
            "/commissions/{id}/status",
            post(admin::update_commission_status::<S>),
        )
}

/// Create all routes for the storefront.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .route("/ref/{code}", get(referral::capture))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}
