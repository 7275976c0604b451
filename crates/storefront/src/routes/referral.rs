//! Affiliate referral links.

use axum::{
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect},
};
use tracing::instrument;

use crate::db::Store;
use crate::middleware::cookies::{is_valid_referral_code, referral_cookie};
use crate::state::AppState;

/// Remember the referral code for later checkouts and send the shopper home.
///
/// Malformed codes are dropped silently. Whether the code belongs to an
/// approved affiliate is decided at checkout.
#[instrument(skip(state))]
pub async fn capture<S: Store>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let cookie = if is_valid_referral_code(&code) {
        Some(referral_cookie(
            &code.to_uppercase(),
            state.secure_cookies(),
        ))
    } else {
        tracing::debug!("Ignoring malformed referral code");
        None
    };

    (
        AppendHeaders(cookie.map(|value| (SET_COOKIE, value))),
        Redirect::to("/"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header};

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, empty_request, send};

    #[tokio::test]
    async fn test_referral_link_sets_cookie_and_redirects() {
        let store = MemoryStore::new();

        let response = send(app(&store, None), empty_request("GET", "/ref/jane10")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("ref_code=JANE10"));
    }

    #[tokio::test]
    async fn test_malformed_referral_code_sets_no_cookie() {
        let store = MemoryStore::new();

        let response = send(app(&store, None), empty_request("GET", "/ref/bad%20code")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
