//! Cart ownership and line-quantity rules.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Smallest quantity a cart line may hold.
pub const MIN_LINE_QUANTITY: i32 = 1;

/// Largest quantity a cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Who a cart belongs to.
///
/// Guest carts are keyed by an opaque token kept in a browser cookie; they
/// are folded into the user's cart on login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    Guest(String),
}

impl CartOwner {
    /// Whether this is an anonymous cart.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(token) => write!(f, "guest:{token}"),
        }
    }
}

/// A requested quantity fell outside `[1, 99]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("quantity must be between 1 and 99 (got {0})")]
pub struct QuantityOutOfRange(pub i32);

/// Validate a quantity supplied by a shopper.
///
/// # Errors
///
/// Returns [`QuantityOutOfRange`] for anything outside `[1, 99]`.
pub const fn validate_quantity(quantity: i32) -> Result<i32, QuantityOutOfRange> {
    if quantity < MIN_LINE_QUANTITY || quantity > MAX_LINE_QUANTITY {
        return Err(QuantityOutOfRange(quantity));
    }
    Ok(quantity)
}

/// Quantity after adding `added` to an existing line, capped at 99.
#[must_use]
pub fn merged_quantity(existing: i32, added: i32) -> i32 {
    existing.saturating_add(added).min(MAX_LINE_QUANTITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity_bounds() {
        assert_eq!(validate_quantity(1), Ok(1));
        assert_eq!(validate_quantity(99), Ok(99));
        assert_eq!(validate_quantity(0), Err(QuantityOutOfRange(0)));
        assert_eq!(validate_quantity(100), Err(QuantityOutOfRange(100)));
        assert_eq!(validate_quantity(-4), Err(QuantityOutOfRange(-4)));
    }

    #[test]
    fn test_merged_quantity_sums_and_caps() {
        assert_eq!(merged_quantity(2, 3), 5);
        assert_eq!(merged_quantity(60, 60), 99);
        assert_eq!(merged_quantity(99, 1), 99);
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(CartOwner::User(UserId::new(3)).to_string(), "user:3");
        assert_eq!(CartOwner::Guest("abc".to_owned()).to_string(), "guest:abc");
        assert!(CartOwner::Guest("abc".to_owned()).is_guest());
    }
}
