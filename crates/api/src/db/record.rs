//! Flat order header shared by the store implementations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use storekeep_core::{
    AddressId, DataValue, Email, FulfillmentState, OrderId, OrderState, OrderTotals, PaymentState,
    UserId,
};

use crate::models::{Address, LineItem, Order};

/// An order row without its line items, addresses or metadata.
#[derive(Debug, Clone)]
pub(super) struct OrderRecord {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub email: Email,
    pub currency: String,
    pub totals: OrderTotals,
    pub payment_state: PaymentState,
    pub fulfillment_state: FulfillmentState,
    pub state: OrderState,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub vat_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn into_order(
        self,
        billing_address: Address,
        shipping_address: Address,
        line_items: Vec<LineItem>,
        data: BTreeMap<String, DataValue>,
    ) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            session_id: self.session_id,
            email: self.email,
            currency: self.currency,
            subtotal: self.totals.subtotal,
            taxes: self.totals.taxes,
            shipping: self.totals.shipping,
            total: self.totals.total,
            payment_state: self.payment_state,
            fulfillment_state: self.fulfillment_state,
            state: self.state,
            billing_address_id: self.billing_address_id,
            billing_address,
            shipping_address_id: self.shipping_address_id,
            shipping_address,
            vat_number: self.vat_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
            line_items,
            data,
        }
    }
}
