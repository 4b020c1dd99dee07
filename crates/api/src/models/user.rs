//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storekeep_core::{Email, UserId};

/// A customer known to the store.
///
/// The ID is the subject issued by the identity provider; users are created
/// the first time an unknown subject places an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Subject ID from the identity provider.
    pub id: UserId,
    /// Email the user was created with.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A user to be inserted alongside a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: UserId,
    pub email: Email,
}
