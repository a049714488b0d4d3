//! Greengate Core - Shared types library.
//!
//! This crate provides common types used across all Greengate Market
//! components:
//! - `storefront` - Public-facing marketplace web client
//! - `integration-tests` - End-to-end tests against a mock marketplace API
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session handling. This keeps it lightweight and allows it to
//! be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses
//! - [`guest_cart`] - The pre-authentication shopping cart and its invariants

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod guest_cart;
pub mod types;

pub use guest_cart::{GuestCart, GuestLine, ProductSnapshot};
pub use types::*;
