//! Dorsal storefront library.
//!
//! Client-side orchestration of a Medusa commerce backend: the cart session,
//! the checkout state machine and the reconciliation of redirect-based
//! payments. All state of record lives in the backend; this crate only holds
//! the cart identifier and short-lived projections of backend data.
//!
//! # Layout
//!
//! - [`medusa`] - HTTP client for the Medusa Store API
//! - [`backend`] - The [`CommerceBackend`](backend::CommerceBackend) port the
//!   orchestration code is written against
//! - [`cart`] - Cart Session Manager
//! - [`checkout`] - Checkout Orchestrator
//! - [`payment`] - Payment Callback Reconciler
//! - [`storage`], [`events`], [`delay`] - Injected ports for persistence,
//!   cart-changed notifications and polling delays

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod delay;
pub mod error;
pub mod events;
pub mod medusa;
pub mod navigation;
pub mod payment;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, Result, StorefrontError, ValidationError};
pub use state::{Settings, Storefront, StorefrontBuilder};
