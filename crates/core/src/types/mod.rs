//! Core types for Storekeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod metadata;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use metadata::{DataType, DataValue, DataValueError};
pub use price::{LineAmount, OrderTotals, PriceError};
pub use status::*;
