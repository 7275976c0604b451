//! Domain models for the storefront.
//!
//! Rows as the services see them. Pure rules (discounts, totals, commission
//! rates) live in `orchard_core`; these types carry the data those rules
//! consume and the records the services persist.

pub mod affiliate;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;

pub use affiliate::{Affiliate, Commission, NewCommission};
pub use cart::{Cart, CartItem, CartLine};
pub use catalog::{Product, StockTarget, Variant};
pub use order::{Customer, NewOrder, NewOrderItem, Order, OrderItem, Payment};
pub use session::{CurrentUser, keys as session_keys};
