//! Domain models for the order API.
//!
//! These are the validated shapes handed between handlers, services and the
//! store, and the JSON shapes returned to clients.

pub mod address;
pub mod claims;
pub mod order;
pub mod user;

pub use address::{Address, AddressChange, AddressError, AddressFields, NewAddress};
pub use claims::Claims;
pub use order::{LineItem, LockViolation, NewLineItem, Order, OrderDraft, OrderPatch};
pub use user::{NewUser, User};
