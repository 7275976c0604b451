//! Session-related types.
//!
//! Types stored in the session for identity state. Sign-in itself happens
//! outside the storefront; whatever performs it writes a [`CurrentUser`]
//! under [`keys::CURRENT_USER`].

use serde::{Deserialize, Serialize};

use orchard_core::{UserId, UserRole};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address, used for order notifications.
    pub email: String,
    /// Display name, shown to admins on new-order alerts.
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether this user may use the admin endpoints.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Session keys for identity data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
