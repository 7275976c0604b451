//! Core types for Orchard.
//!
//! Type-safe wrappers for ids, money, statuses and addresses.

pub mod address;
pub mod id;
pub mod money;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use id::*;
pub use status::*;
