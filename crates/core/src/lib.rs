//! Dorsal Core - Shared domain types.
//!
//! This crate provides the value types used across the Dorsal components:
//! - `storefront` - Commerce client, cart session and checkout orchestration
//! - `cli` - Command-line driver for the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. Everything here can be constructed in tests without a backend.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, money, emails, addresses and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
