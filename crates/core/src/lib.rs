//! Orchard Core - Domain types and pricing rules.
//!
//! This crate is shared by every Orchard component:
//! - `storefront` - Cart, checkout, payment confirmation and the HTTP surface
//! - `cli` - Migrations and settings management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The checkout and commission services gather what
//! they need inside a transaction and hand it to the rules defined here.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, money helpers, statuses and addresses
//! - [`cart`] - Cart ownership and quantity rules
//! - [`pricing`] - Coupons, discount precedence, totals and commission rates
//! - [`settings`] - Typed store settings with fallbacks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pricing;
pub mod settings;
pub mod types;

pub use settings::StoreSettings;
pub use types::*;
