//! Cart route handlers.
//!
//! Signed-in shoppers use their user cart. Guests are identified by the
//! `orchard_cart` cookie, which is issued on the first add.

use axum::{
    Json,
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use orchard_core::cart::CartOwner;
use orchard_core::{CartItemId, ProductId, VariantId};

use crate::db::Store;
use crate::error::Result;
use crate::middleware::{
    OptionalAuth, RequireAuth, ShopperCookies, clear_guest_cart_cookie, guest_cart_cookie,
};
use crate::models::CurrentUser;
use crate::services::{CartError, CartView};
use crate::state::AppState;

/// Add to cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// The cart a request acts on, if it has one yet.
pub(crate) fn cart_owner(
    user: Option<&CurrentUser>,
    cookies: &ShopperCookies,
) -> Option<CartOwner> {
    match user {
        Some(user) => Some(CartOwner::User(user.id)),
        None => cookies.guest_cart.clone().map(CartOwner::Guest),
    }
}

/// Display the cart.
#[instrument(skip(state, user, cookies))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
) -> Result<Json<CartView>> {
    let view = match cart_owner(user.as_ref(), &cookies) {
        Some(owner) => state.cart().view(&owner).await?,
        None => CartView::empty(),
    };
    Ok(Json(view))
}

/// Add an item, starting a guest cart if the shopper has none.
#[instrument(skip(state, user, cookies))]
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
    Json(request): Json<AddItemRequest>,
) -> Result<impl IntoResponse> {
    let (owner, new_cookie) = match cart_owner(user.as_ref(), &cookies) {
        Some(owner) => (owner, None),
        None => {
            let token = Uuid::new_v4().to_string();
            let cookie = guest_cart_cookie(&token, state.secure_cookies());
            (CartOwner::Guest(token), Some(cookie))
        }
    };

    let view = state
        .cart()
        .add_item(
            &owner,
            request.product_id,
            request.variant_id,
            request.quantity,
        )
        .await?;

    Ok((
        AppendHeaders(new_cookie.map(|value| (SET_COOKIE, value))),
        Json(view),
    ))
}

/// Set the quantity of one cart item.
#[instrument(skip(state, user, cookies))]
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
    Path(item_id): Path<CartItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let owner = cart_owner(user.as_ref(), &cookies).ok_or(CartError::ItemNotFound)?;
    let view = state
        .cart()
        .update_quantity(&owner, item_id, request.quantity)
        .await?;
    Ok(Json(view))
}

/// Remove one cart item.
#[instrument(skip(state, user, cookies))]
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    cookies: ShopperCookies,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let owner = cart_owner(user.as_ref(), &cookies).ok_or(CartError::ItemNotFound)?;
    let view = state.cart().remove_item(&owner, item_id).await?;
    Ok(Json(view))
}

/// Fold the guest cart into the signed-in user's cart and drop the cookie.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn merge<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    cookies: ShopperCookies,
) -> Result<impl IntoResponse> {
    let (view, cleared) = match cookies.guest_cart {
        Some(token) => (
            state.cart().merge_guest_cart(&token, user.id).await?,
            Some(clear_guest_cart_cookie(state.secure_cookies())),
        ),
        None => (state.cart().view(&CartOwner::User(user.id)).await?, None),
    };

    Ok((
        AppendHeaders(cleared.map(|value| (SET_COOKIE, value))),
        Json(view),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header};
    use rust_decimal::Decimal;
    use serde_json::json;

    use orchard_core::UserRole;

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, body_json, empty_request, json_request, send, user};

    fn guest_token(response: &axum::response::Response) -> String {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| value.strip_prefix("orchard_cart="))
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_guest_add_issues_cart_cookie() {
        let store = MemoryStore::new();
        let product = store
            .seed(|s| s.add_product("Lamp", Decimal::new(2500, 2), 10))
            .await;

        let response = send(
            app(&store, None),
            json_request(
                "POST",
                "/cart/items",
                &json!({ "productId": product, "quantity": 2 }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let token = guest_token(&response);
        let body = body_json(response).await;
        assert_eq!(body["item_count"], 2);
        let subtotal: Decimal = body["subtotal"].as_str().unwrap().parse().unwrap();
        assert_eq!(subtotal, Decimal::from(50));

        let mut request = empty_request("GET", "/cart");
        request.headers_mut().insert(
            header::COOKIE,
            format!("orchard_cart={token}").parse().unwrap(),
        );
        let body = body_json(send(app(&store, None), request).await).await;
        assert_eq!(body["item_count"], 2);
    }

    #[tokio::test]
    async fn test_empty_cart_without_identity() {
        let store = MemoryStore::new();

        let response = send(app(&store, None), empty_request("GET", "/cart")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["item_count"], 0);
        assert_eq!(body["lines"], json!([]));
    }

    #[tokio::test]
    async fn test_quantity_out_of_range_is_bad_request() {
        let store = MemoryStore::new();
        let (customer, product) = store
            .seed(|s| {
                let customer = s.add_customer("c@example.com", "C");
                let product = s.add_product("Lamp", Decimal::new(2500, 2), 10);
                (customer, product)
            })
            .await;

        let response = send(
            app(&store, Some(user(customer, UserRole::Customer))),
            json_request(
                "POST",
                "/cart/items",
                &json!({ "productId": product, "quantity": 100 }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_merge_requires_sign_in() {
        let store = MemoryStore::new();

        let response = send(app(&store, None), empty_request("POST", "/cart/merge")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_merge_folds_guest_cart_and_clears_cookie() {
        let store = MemoryStore::new();
        let (customer, product) = store
            .seed(|s| {
                let customer = s.add_customer("c@example.com", "C");
                let product = s.add_product("Lamp", Decimal::new(2500, 2), 10);
                (customer, product)
            })
            .await;

        let response = send(
            app(&store, None),
            json_request("POST", "/cart/items", &json!({ "productId": product })),
        )
        .await;
        let token = guest_token(&response);

        let mut request = empty_request("POST", "/cart/merge");
        request.headers_mut().insert(
            header::COOKIE,
            format!("orchard_cart={token}").parse().unwrap(),
        );
        let response = send(app(&store, Some(user(customer, UserRole::Customer))), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(guest_token(&response), "");
        let body = body_json(response).await;
        assert_eq!(body["item_count"], 1);
    }
}
