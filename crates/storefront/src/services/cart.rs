//! Cart operations.
//!
//! Carts belong to a signed-in user or to a guest token. Each operation runs
//! in its own transaction and returns the cart as it stands afterwards.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use orchard_core::cart::{CartOwner, QuantityOutOfRange, merged_quantity, validate_quantity};
use orchard_core::pricing::totals::subtotal;
use orchard_core::{CartItemId, ProductId, UserId, VariantId};

use crate::db::{RepositoryError, Store, StoreTx};
use crate::models::{Cart, CartLine};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity outside `[1, 99]`.
    #[error(transparent)]
    InvalidQuantity(#[from] QuantityOutOfRange),

    /// Product does not exist or is not for sale.
    #[error("product not found")]
    ProductNotFound,

    /// Product has variants but none was chosen.
    #[error("choose an option for {0}")]
    VariantRequired(String),

    /// Variant does not exist or belongs to another product.
    #[error("variant not found")]
    VariantNotFound,

    /// Item is not in this cart.
    #[error("cart item not found")]
    ItemNotFound,

    /// Requested quantity exceeds what is in stock.
    #[error("only {available} of {product} in stock")]
    InsufficientStock { product: String, available: i32 },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart priced against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub item_count: i32,
}

impl CartView {
    fn from_lines(lines: Vec<CartLine>) -> Self {
        let subtotal = subtotal(lines.iter().map(|line| (line.unit_price, line.quantity)));
        let item_count = lines.iter().map(|line| line.quantity).sum();
        Self {
            lines,
            subtotal,
            item_count,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::from_lines(Vec::new())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart service.
pub struct CartService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> CartService<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The cart of `owner`. An empty guest cart is deleted on sight.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn view(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let mut tx = self.store.begin().await?;

        let Some(cart) = tx.find_cart(owner).await? else {
            tx.rollback().await?;
            return Ok(CartView::empty());
        };

        let lines = tx.cart_lines(cart.id).await?;
        if lines.is_empty() && owner.is_guest() {
            tx.delete_cart(cart.id).await?;
            tracing::debug!(cart_id = %cart.id, "Deleted empty guest cart");
        }
        tx.commit().await?;

        Ok(CartView::from_lines(lines))
    }

    /// Add `quantity` of a product (or one of its variants).
    ///
    /// Adding a line that is already in the cart increases its quantity,
    /// capped at 99.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity outside `[1, 99]`.
    /// Returns `CartError::ProductNotFound` if the product is missing or inactive.
    /// Returns `CartError::VariantRequired` / `CartError::VariantNotFound` for a
    /// missing or mismatched variant.
    /// Returns `CartError::InsufficientStock` if the resulting quantity exceeds stock.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let quantity = validate_quantity(quantity)?;
        let mut tx = self.store.begin().await?;

        let product = tx
            .get_product(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(CartError::ProductNotFound)?;

        let (name, stock) = match variant_id {
            Some(variant_id) => {
                let variant = tx
                    .get_variant(variant_id)
                    .await?
                    .filter(|v| v.product_id == product.id)
                    .ok_or(CartError::VariantNotFound)?;
                (format!("{} ({})", product.name, variant.name), variant.stock)
            }
            None if product.has_variants => {
                return Err(CartError::VariantRequired(product.name));
            }
            None => (product.name.clone(), product.stock),
        };

        let cart = find_or_create_cart(&mut tx, owner).await?;
        let existing = tx.find_cart_item(cart.id, product_id, variant_id).await?;
        let new_quantity = existing
            .as_ref()
            .map_or(quantity, |item| merged_quantity(item.quantity, quantity));

        if new_quantity > stock {
            return Err(CartError::InsufficientStock {
                product: name,
                available: stock,
            });
        }

        match existing {
            Some(item) => tx.set_cart_item_quantity(item.id, new_quantity).await?,
            None => {
                tx.insert_cart_item(cart.id, product_id, variant_id, new_quantity)
                    .await?;
            }
        }

        let lines = tx.cart_lines(cart.id).await?;
        tx.commit().await?;

        tracing::info!(%product_id, quantity = new_quantity, "Cart item added");
        Ok(CartView::from_lines(lines))
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity outside `[1, 99]`.
    /// Returns `CartError::ItemNotFound` if the item is not in the owner's cart.
    /// Returns `CartError::InsufficientStock` if the quantity exceeds stock.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let quantity = validate_quantity(quantity)?;
        let mut tx = self.store.begin().await?;

        let cart = tx.find_cart(owner).await?.ok_or(CartError::ItemNotFound)?;
        let line = tx
            .cart_lines(cart.id)
            .await?
            .into_iter()
            .find(|line| line.item_id == item_id)
            .ok_or(CartError::ItemNotFound)?;

        if quantity > line.stock {
            return Err(CartError::InsufficientStock {
                product: line.display_name(),
                available: line.stock,
            });
        }

        tx.set_cart_item_quantity(item_id, quantity).await?;
        let lines = tx.cart_lines(cart.id).await?;
        tx.commit().await?;

        Ok(CartView::from_lines(lines))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not in the owner's cart.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
    ) -> Result<CartView, CartError> {
        let mut tx = self.store.begin().await?;

        let cart = tx.find_cart(owner).await?.ok_or(CartError::ItemNotFound)?;
        let items = tx.cart_items(cart.id).await?;
        if !items.iter().any(|item| item.id == item_id) {
            return Err(CartError::ItemNotFound);
        }

        tx.delete_cart_item(item_id).await?;
        let lines = tx.cart_lines(cart.id).await?;
        tx.commit().await?;

        Ok(CartView::from_lines(lines))
    }

    /// Fold a guest cart into a user's cart after sign-in.
    ///
    /// Lines present in both are summed and capped at 99. The guest cart is
    /// deleted. Without a guest cart this just returns the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self, guest_token))]
    pub async fn merge_guest_cart(
        &self,
        guest_token: &str,
        user_id: UserId,
    ) -> Result<CartView, CartError> {
        let mut tx = self.store.begin().await?;
        let guest = tx
            .find_cart(&CartOwner::Guest(guest_token.to_owned()))
            .await?;
        let user_owner = CartOwner::User(user_id);

        let Some(guest) = guest else {
            let lines = match tx.find_cart(&user_owner).await? {
                Some(cart) => tx.cart_lines(cart.id).await?,
                None => Vec::new(),
            };
            tx.rollback().await?;
            return Ok(CartView::from_lines(lines));
        };

        let guest_items = tx.cart_items(guest.id).await?;
        let cart = find_or_create_cart(&mut tx, &user_owner).await?;

        for item in &guest_items {
            match tx
                .find_cart_item(cart.id, item.product_id, item.variant_id)
                .await?
            {
                Some(existing) => {
                    let quantity = merged_quantity(existing.quantity, item.quantity);
                    tx.set_cart_item_quantity(existing.id, quantity).await?;
                }
                None => {
                    tx.insert_cart_item(cart.id, item.product_id, item.variant_id, item.quantity)
                        .await?;
                }
            }
        }

        tx.delete_cart(guest.id).await?;
        let lines = tx.cart_lines(cart.id).await?;
        tx.commit().await?;

        tracing::info!(merged = guest_items.len(), "Guest cart merged");
        Ok(CartView::from_lines(lines))
    }
}

async fn find_or_create_cart<T: StoreTx>(
    tx: &mut T,
    owner: &CartOwner,
) -> Result<Cart, RepositoryError> {
    match tx.find_cart(owner).await? {
        Some(cart) => Ok(cart),
        None => tx.create_cart(owner).await,
    }
}
