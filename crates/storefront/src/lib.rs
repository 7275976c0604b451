//! Orchard storefront library.
//!
//! Cart, checkout, payment confirmation and affiliate commissions, exposed
//! as a library so the binary, the CLI and the integration tests share one
//! implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::db::Store;
use crate::state::AppState;

/// Build the application router over `state`.
///
/// The session layer is left to the caller so the binary can use the
/// `PostgreSQL` session store and tests an in-memory one.
pub fn app<S: Store>(state: AppState<S>) -> Router {
    routes::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
