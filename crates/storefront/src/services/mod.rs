//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Guest and user carts, merge on sign-in
//! - `checkout` - Code validation, quotes, order placement
//! - `payments` - Payment submission and confirmation, order status
//! - `commissions` - Commission payout status
//! - `orders` - Order history and detail
//! - `notifications` - Fire-and-forget email/log notifications
//!
//! Services are generic over [`Store`](crate::db::Store) and each operation
//! runs in a single store transaction.

pub mod cart;
pub mod checkout;
pub mod commissions;
pub mod discounts;
pub mod notifications;
pub mod orders;
pub mod payments;

pub use cart::{CartError, CartService, CartView};
pub use checkout::{
    AcceptedCode, CheckoutError, CheckoutService, PlaceOrderRequest, PlacedOrder, Quote,
};
pub use commissions::{CommissionError, CommissionService};
pub use notifications::{EmailNotifier, ItemSummary, LogNotifier, Notifier};
pub use orders::{OrderDetail, OrderService};
pub use payments::{Confirmation, PaymentError, PaymentService};
