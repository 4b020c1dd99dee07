//! Persistence for users, addresses and orders.
//!
//! # Tables
//!
//! - `users` - Customers, keyed by identity provider subject
//! - `addresses` - Billing and shipping addresses
//! - `orders` - Order header with totals and lifecycle states
//! - `line_items` - Purchased lines per order
//! - `order_data` - Typed metadata per order, one row per key
//!
//! Handlers never touch a pool directly: they go through the [`Store`]
//! trait, implemented by [`PgStore`] in production and [`MemoryStore`] in
//! tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storekeep-cli -- migrate
//! ```

mod memory;
mod postgres;
mod record;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storekeep_core::{AddressId, OrderId, UserId};

use crate::models::{Address, LockViolation, Order, OrderDraft, OrderPatch, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate ID).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The write would change a field the order's state has frozen.
    #[error(transparent)]
    Locked(#[from] LockViolation),
}

/// Storage operations the API depends on.
///
/// Multi-entity writes (`insert_order`, `apply_order_update`) are atomic:
/// either every row lands or none does.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// All users, optionally restricted to an exact email match.
    async fn list_users(&self, email: Option<&str>) -> Result<Vec<User>, RepositoryError>;

    async fn list_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError>;

    async fn find_address(&self, id: &AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Orders owned by `user_id`, newest first.
    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError>;

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Persist a new order with its user, addresses and line items.
    async fn insert_order(&self, draft: OrderDraft) -> Result<Order, RepositoryError>;

    /// Apply `patch` to an order, re-checking its locks under the write.
    ///
    /// Returns the order as stored after the change.
    async fn apply_order_update(
        &self,
        id: &OrderId,
        patch: OrderPatch,
    ) -> Result<Order, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
