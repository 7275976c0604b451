//! Shopper cookies: the guest cart token and the affiliate referral code.
//!
//! Both live for 30 days and are readable only by the server.

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

/// Referral code captured from `/ref/{code}` links.
pub const REFERRAL_COOKIE: &str = "ref_code";

/// Opaque token naming a guest cart.
pub const GUEST_CART_COOKIE: &str = "orchard_cart";

const COOKIE_MAX_AGE_DAYS: i64 = 30;
const MAX_REFERRAL_CODE_LEN: usize = 32;

/// Cookie values the cart and checkout routes care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopperCookies {
    pub guest_cart: Option<String>,
    pub referral_code: Option<String>,
}

impl<S> FromRequestParts<S> for ShopperCookies
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mut cookies = Self::default();

        for header in parts.headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(header).flatten() {
                match cookie.name() {
                    GUEST_CART_COOKIE if !cookie.value().is_empty() => {
                        cookies.guest_cart = Some(cookie.value().to_string());
                    }
                    REFERRAL_COOKIE if is_valid_referral_code(cookie.value()) => {
                        cookies.referral_code = Some(cookie.value().to_string());
                    }
                    _ => {}
                }
            }
        }

        Ok(cookies)
    }
}

/// Referral codes are short and limited to letters, digits, `-` and `_`.
#[must_use]
pub fn is_valid_referral_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_REFERRAL_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `Set-Cookie` value remembering a referral code.
#[must_use]
pub fn referral_cookie(code: &str, secure: bool) -> String {
    shopper_cookie(
        REFERRAL_COOKIE,
        code.to_string(),
        Duration::days(COOKIE_MAX_AGE_DAYS),
        secure,
    )
}

/// `Set-Cookie` value naming a new guest cart.
#[must_use]
pub fn guest_cart_cookie(token: &str, secure: bool) -> String {
    shopper_cookie(
        GUEST_CART_COOKIE,
        token.to_string(),
        Duration::days(COOKIE_MAX_AGE_DAYS),
        secure,
    )
}

/// `Set-Cookie` value expiring the guest cart cookie.
#[must_use]
pub fn clear_guest_cart_cookie(secure: bool) -> String {
    shopper_cookie(GUEST_CART_COOKIE, String::new(), Duration::ZERO, secure)
}

fn shopper_cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> String {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
        .to_string()
}
