//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::cart::CartOwner;
use orchard_core::pricing::DiscountCodes;

use crate::db::Store;
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth, ShopperCookies};
use crate::routes::cart::cart_owner;
use crate::services::{AcceptedCode, CheckoutError, PlaceOrderRequest, PlacedOrder, Quote};
use crate::state::AppState;

/// Code typed into the discount field.
#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

/// Totals preview request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Check a code as the shopper types it.
#[instrument(skip(state, user, cookies))]
pub async fn validate_code<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
    Json(request): Json<CodeRequest>,
) -> Result<Json<AcceptedCode>> {
    let owner = cart_owner(user.as_ref(), &cookies);
    let accepted = state
        .checkout()
        .validate_code(owner.as_ref(), &request.code)
        .await?;
    Ok(Json(accepted))
}

/// Preview totals for the current cart. The referral cookie counts.
#[instrument(skip(state, user, cookies))]
pub async fn quote<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>> {
    let owner = cart_owner(user.as_ref(), &cookies).ok_or(CheckoutError::EmptyCart)?;
    let codes = DiscountCodes::new(
        request.discount_code.as_deref(),
        cookies.referral_code.as_deref(),
    );
    let quote = state.checkout().quote(&owner, &codes).await?;
    Ok(Json(quote))
}

/// Place an order from the signed-in user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    cookies: ShopperCookies,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = state
        .checkout()
        .place_order(
            &user,
            &CartOwner::User(user.id),
            request,
            cookies.referral_code.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
