//! Business logic for the API.
//!
//! Services take a borrowed [`Store`](crate::db::Store) and
//! [`AccessPolicy`](policy::AccessPolicy) so handlers can build them per
//! request from the shared state.

pub mod order_email;
pub mod orders;
pub mod policy;
pub mod token;
pub mod users;

pub use orders::{CreateOrderRequest, OrderService, UpdateOrderRequest};
pub use policy::AccessPolicy;
pub use token::TokenVerifier;
pub use users::UserService;
