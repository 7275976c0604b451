//! HTTP middleware and extractors for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. Session layer (tower-sessions with `PostgreSQL` store)
//! 3. `TraceLayer` (request tracing)
//!
//! Identity and shopper cookies are read per handler through the extractors
//! in [`auth`] and [`cookies`].

pub mod auth;
pub mod cookies;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use cookies::{
    GUEST_CART_COOKIE, REFERRAL_COOKIE, ShopperCookies, clear_guest_cart_cookie,
    guest_cart_cookie, referral_cookie,
};
pub use session::create_session_layer;
