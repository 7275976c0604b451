//! Catalog rows: products, variants and the stock they carry.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use orchard_core::{ProductId, VariantId};

/// A product as sold.
///
/// For products with variants, `price` and `stock` are informational only;
/// every cart line must name a variant and the variant's values apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub has_variants: bool,
    pub active: bool,
}

/// A purchasable option of a product with its own price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock: i32,
}

/// The row whose stock counter a cart line draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StockTarget {
    Product(ProductId),
    Variant(VariantId),
}

impl StockTarget {
    /// Variant stock when a variant is named, otherwise product stock.
    #[must_use]
    pub const fn for_line(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        match variant_id {
            Some(id) => Self::Variant(id),
            None => Self::Product(product_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_target_prefers_variant() {
        assert_eq!(
            StockTarget::for_line(ProductId::new(1), Some(VariantId::new(7))),
            StockTarget::Variant(VariantId::new(7))
        );
        assert_eq!(
            StockTarget::for_line(ProductId::new(1), None),
            StockTarget::Product(ProductId::new(1))
        );
    }
}
