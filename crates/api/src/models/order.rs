//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storekeep_core::{
    AddressId, DataValue, Email, FulfillmentState, LineAmount, LineItemId, OrderId, OrderState,
    OrderTotals, PaymentState, UserId,
};

use super::address::{Address, AddressChange};
use super::user::NewUser;

/// A customer order with its line items, addresses and metadata.
///
/// The owning user is referenced by ID only and never embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Owner; `None` for guest checkouts.
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub email: Email,
    pub currency: String,

    pub subtotal: i64,
    pub taxes: i64,
    pub shipping: i64,
    pub total: i64,

    pub payment_state: PaymentState,
    pub fulfillment_state: FulfillmentState,
    pub state: OrderState,

    pub billing_address_id: AddressId,
    pub billing_address: Address,
    pub shipping_address_id: AddressId,
    pub shipping_address: Address,

    pub vat_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub line_items: Vec<LineItem>,
    pub data: BTreeMap<String, DataValue>,
}

/// A purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub sku: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Unit price in minor units.
    pub price: i64,
    pub quantity: i32,
    /// VAT rate in percent.
    pub vat: i32,
    /// Catalog path of the product.
    pub path: String,
}

/// A line item as submitted with a new order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLineItem {
    pub sku: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: i64,
    pub quantity: i32,
    pub vat: i32,
    pub path: String,
}

impl NewLineItem {
    /// The priced part of this line.
    #[must_use]
    pub const fn amount(&self) -> LineAmount {
        LineAmount {
            price: self.price,
            quantity: self.quantity,
            vat: self.vat,
        }
    }
}

/// Everything needed to persist a new order in one transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: OrderId,
    /// User to create first, when the subject is not yet known.
    pub new_user: Option<NewUser>,
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub email: Email,
    pub currency: String,
    pub vat_number: String,
    pub totals: OrderTotals,
    pub billing: AddressChange,
    /// `None` ships to the billing address.
    pub shipping: Option<AddressChange>,
    pub line_items: Vec<NewLineItem>,
}

/// An order field that can no longer change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockViolation {
    #[error("Cannot change the {0} of an order that has been paid")]
    Paid(&'static str),
    #[error("Cannot change the shipping address of an order that has left fulfillment pending")]
    Fulfillment,
}

/// A validated partial update of an order.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub email: Option<Email>,
    pub currency: Option<String>,
    pub billing: Option<AddressChange>,
    pub shipping: Option<AddressChange>,
    /// Metadata entries to upsert, keyed by name.
    pub data: Vec<(String, DataValue)>,
}

impl OrderPatch {
    /// Check this patch against the order's lifecycle locks.
    ///
    /// # Errors
    ///
    /// Returns a [`LockViolation`] if the patch touches the currency or
    /// billing address of a paid order, or the shipping address of an order
    /// whose fulfillment has started.
    pub const fn check_locks(
        &self,
        payment: PaymentState,
        fulfillment: FulfillmentState,
    ) -> Result<(), LockViolation> {
        if payment.is_paid() {
            if self.currency.is_some() {
                return Err(LockViolation::Paid("currency"));
            }
            if self.billing.is_some() {
                return Err(LockViolation::Paid("billing address"));
            }
        }
        if fulfillment.locks_shipping_address() && self.shipping.is_some() {
            return Err(LockViolation::Fulfillment);
        }
        Ok(())
    }
}
