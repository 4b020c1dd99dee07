//! Storekeep Core - Shared types library.
//!
//! This crate provides the vocabulary shared by the Storekeep components:
//! - `api` - Order-management HTTP service
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. With the `postgres` feature enabled, IDs and
//! emails also implement the sqlx encoding traits.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, order states, metadata values and totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
