//! Core types for Dorsal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use address::{AddressError, AddressInput, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, CurrencyError, Money};
pub use status::*;
