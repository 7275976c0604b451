//! Carts, their items, and priced cart lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use orchard_core::cart::CartOwner;
use orchard_core::{CartId, CartItemId, ProductId, VariantId};

use super::catalog::StockTarget;

/// A cart owned by a user or a guest token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One `(product, variant)` line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
}

/// A cart item joined with the live catalog.
///
/// `unit_price` and `stock` come from the variant when one is named,
/// otherwise from the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock: i32,
    /// Whether the product is still for sale.
    pub active: bool,
    /// Whether the product is sold only through its variants.
    pub has_variants: bool,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// A line without a variant whose product has since gained variants.
    /// Its product-level price and stock no longer apply.
    #[must_use]
    pub const fn needs_variant(&self) -> bool {
        self.has_variants && self.variant_id.is_none()
    }

    #[must_use]
    pub const fn stock_target(&self) -> StockTarget {
        StockTarget::for_line(self.product_id, self.variant_id)
    }

    /// Name used in stock errors and alerts, e.g. `Tee (Large)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.variant_name {
            Some(variant) => format!("{} ({variant})", self.product_name),
            None => self.product_name.clone(),
        }
    }
}
