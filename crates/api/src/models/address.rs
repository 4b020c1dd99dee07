//! Postal addresses used for billing and shipping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storekeep_core::{AddressId, UserId};

/// Validation failure for submitted address fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is missing required field '{0}'")]
    MissingField(&'static str),
}

/// The editable part of an address, as submitted by clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressFields {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub country: String,
    pub state: String,
    pub zip: String,
}

impl AddressFields {
    /// Check that every required field carries a non-blank value.
    ///
    /// # Errors
    ///
    /// Returns the first missing field among last name, street, city,
    /// country and zip.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("country", &self.country),
            ("zip", &self.zip),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Owner; `None` for addresses entered during guest checkout.
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Whether this address may be attached to an order owned by `owner`.
    ///
    /// Guest addresses are never reusable.
    #[must_use]
    pub fn belongs_to(&self, owner: Option<&UserId>) -> bool {
        match (self.user_id.as_ref(), owner) {
            (Some(address_owner), Some(owner)) => address_owner == owner,
            _ => false,
        }
    }
}

/// An address to be created within an order transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub id: AddressId,
    pub user_id: Option<UserId>,
    pub fields: AddressFields,
}

impl NewAddress {
    /// Validate `fields` and assign a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] if a required field is blank.
    pub fn new(user_id: Option<UserId>, fields: AddressFields) -> Result<Self, AddressError> {
        fields.validate()?;
        Ok(Self {
            id: AddressId::generate(),
            user_id,
            fields,
        })
    }
}

/// How an order slot (billing or shipping) gets its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressChange {
    /// Point at an address that already exists.
    Existing(AddressId),
    /// Create the address in the same transaction.
    Create(NewAddress),
}

impl AddressChange {
    /// ID the slot will reference once applied.
    #[must_use]
    pub const fn id(&self) -> &AddressId {
        match self {
            Self::Existing(id) => id,
            Self::Create(address) => &address.id,
        }
    }
}
