//! In-process store.
//!
//! Every write happens under a single write guard and validates all
//! references before mutating anything, so a failed write leaves no trace.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use storekeep_core::{
    AddressId, DataValue, FulfillmentState, LineItemId, OrderId, OrderState, PaymentState, UserId,
};

use super::record::OrderRecord;
use super::{RepositoryError, Store};
use crate::models::{Address, AddressChange, LineItem, Order, OrderDraft, OrderPatch, User};

/// Store holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    addresses: BTreeMap<AddressId, Address>,
    orders: BTreeMap<OrderId, OrderRecord>,
    line_items: Vec<LineItem>,
    data: BTreeMap<OrderId, BTreeMap<String, DataValue>>,
    last_line_item_id: i64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id.clone(), user);
    }

    /// Insert or replace an address.
    pub async fn insert_address(&self, address: Address) {
        self.tables
            .write()
            .await
            .addresses
            .insert(address.id.clone(), address);
    }

    /// Move an order to a new payment state, as a payment processor would.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_state(
        &self,
        id: &OrderId,
        state: PaymentState,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.payment_state = state;
        if state.is_paid() {
            record.state = OrderState::Paid;
        }
        Ok(())
    }

    /// Move an order to a new fulfillment state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_fulfillment_state(
        &self,
        id: &OrderId,
        state: FulfillmentState,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.fulfillment_state = state;
        if state == FulfillmentState::Shipped {
            record.state = OrderState::Shipped;
        }
        Ok(())
    }
}

impl Tables {
    fn order(&self, record: &OrderRecord) -> Result<Order, RepositoryError> {
        let address = |id: &AddressId| {
            self.addresses.get(id).cloned().ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order {} references missing address {id}",
                    record.id
                ))
            })
        };

        let billing = address(&record.billing_address_id)?;
        let shipping = address(&record.shipping_address_id)?;
        let line_items = self
            .line_items
            .iter()
            .filter(|item| item.order_id == record.id)
            .cloned()
            .collect();
        let data = self.data.get(&record.id).cloned().unwrap_or_default();

        Ok(record.clone().into_order(billing, shipping, line_items, data))
    }

    fn check_address(&self, change: &AddressChange) -> Result<(), RepositoryError> {
        match change {
            AddressChange::Existing(id) if !self.addresses.contains_key(id) => Err(
                RepositoryError::Conflict(format!("address {id} does not exist")),
            ),
            AddressChange::Create(address) if self.addresses.contains_key(&address.id) => Err(
                RepositoryError::Conflict("address already exists".to_owned()),
            ),
            _ => Ok(()),
        }
    }

    fn apply_address(&mut self, change: AddressChange) -> AddressId {
        match change {
            AddressChange::Existing(id) => id,
            AddressChange::Create(address) => {
                let id = address.id.clone();
                self.addresses.insert(
                    id.clone(),
                    Address {
                        id: address.id,
                        user_id: address.user_id,
                        fields: address.fields,
                        created_at: Utc::now(),
                    },
                );
                id
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn list_users(&self, email: Option<&str>) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|user| email.is_none_or(|email| user.email.as_str() == email))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn list_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut addresses: Vec<Address> = tables
            .addresses
            .values()
            .filter(|address| address.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect();
        addresses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(addresses)
    }

    async fn find_address(&self, id: &AddressId) -> Result<Option<Address>, RepositoryError> {
        Ok(self.tables.read().await.addresses.get(id).cloned())
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut records: Vec<&OrderRecord> = tables
            .orders
            .values()
            .filter(|record| record.user_id.as_ref() == Some(user_id))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        records.into_iter().map(|record| tables.order(record)).collect()
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .orders
            .get(id)
            .map(|record| tables.order(record))
            .transpose()
    }

    async fn insert_order(&self, draft: OrderDraft) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.orders.contains_key(&draft.id) {
            return Err(RepositoryError::Conflict("order already exists".to_owned()));
        }
        tables.check_address(&draft.billing)?;
        if let Some(shipping) = &draft.shipping {
            tables.check_address(shipping)?;
        }

        let now = Utc::now();
        if let Some(user) = draft.new_user {
            tables.users.entry(user.id.clone()).or_insert(User {
                id: user.id,
                email: user.email,
                created_at: now,
                updated_at: now,
            });
        }

        let billing_address_id = tables.apply_address(draft.billing);
        let shipping_address_id = match draft.shipping {
            Some(change) => tables.apply_address(change),
            None => billing_address_id.clone(),
        };

        for item in draft.line_items {
            tables.last_line_item_id += 1;
            let id = LineItemId::new(tables.last_line_item_id);
            tables.line_items.push(LineItem {
                id,
                order_id: draft.id.clone(),
                sku: item.sku,
                title: item.title,
                description: item.description,
                kind: item.kind,
                price: item.price,
                quantity: item.quantity,
                vat: item.vat,
                path: item.path,
            });
        }

        let record = OrderRecord {
            id: draft.id.clone(),
            user_id: draft.user_id,
            session_id: draft.session_id,
            email: draft.email,
            currency: draft.currency,
            totals: draft.totals,
            payment_state: PaymentState::default(),
            fulfillment_state: FulfillmentState::default(),
            state: OrderState::default(),
            billing_address_id,
            shipping_address_id,
            vat_number: draft.vat_number,
            created_at: now,
            updated_at: now,
        };
        let order = tables.order(&record)?;
        tables.orders.insert(draft.id, record);
        Ok(order)
    }

    async fn apply_order_update(
        &self,
        id: &OrderId,
        patch: OrderPatch,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;

        let record = tables.orders.get(id).ok_or(RepositoryError::NotFound)?;
        patch.check_locks(record.payment_state, record.fulfillment_state)?;
        if let Some(billing) = &patch.billing {
            tables.check_address(billing)?;
        }
        if let Some(shipping) = &patch.shipping {
            tables.check_address(shipping)?;
        }

        let billing_id = patch.billing.map(|change| tables.apply_address(change));
        let shipping_id = patch.shipping.map(|change| tables.apply_address(change));

        if !patch.data.is_empty() {
            let values = tables.data.entry(id.clone()).or_default();
            for (key, value) in patch.data {
                values.insert(key, value);
            }
        }

        let record = tables.orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if let Some(email) = patch.email {
            record.email = email;
        }
        if let Some(currency) = patch.currency {
            record.currency = currency;
        }
        if let Some(billing_id) = billing_id {
            record.billing_address_id = billing_id;
        }
        if let Some(shipping_id) = shipping_id {
            record.shipping_address_id = shipping_id;
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        tables.order(&record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storekeep_core::{Email, OrderTotals};

    use super::*;
    use crate::models::{AddressFields, NewAddress, NewLineItem, NewUser};

    fn fields(last_name: &str) -> AddressFields {
        AddressFields {
            last_name: last_name.into(),
            address1: "1 Circus Lane".into(),
            city: "Gotham".into(),
            country: "US".into(),
            zip: "10001".into(),
            ..Default::default()
        }
    }

    fn draft(user: &str) -> OrderDraft {
        let user_id = UserId::new(user);
        OrderDraft {
            id: OrderId::generate(),
            new_user: Some(NewUser {
                id: user_id.clone(),
                email: Email::parse("robin@dc.com").unwrap(),
            }),
            user_id: Some(user_id.clone()),
            session_id: "session".into(),
            email: Email::parse("robin@dc.com").unwrap(),
            currency: "USD".into(),
            vat_number: String::new(),
            totals: OrderTotals::compute([], 0).unwrap(),
            billing: AddressChange::Create(
                NewAddress::new(Some(user_id), fields("Grayson")).unwrap(),
            ),
            shipping: None,
            line_items: vec![NewLineItem {
                sku: "batarang".into(),
                quantity: 2,
                price: 100,
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn test_insert_creates_user_address_and_items() {
        let store = MemoryStore::new();
        let order = store.insert_order(draft("robin")).await.unwrap();

        assert_eq!(order.billing_address_id, order.shipping_address_id);
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].id, LineItemId::new(1));
        assert!(store.find_user(&UserId::new("robin")).await.unwrap().is_some());
        assert_eq!(
            store.list_addresses(&UserId::new("robin")).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_insert_writes_nothing() {
        let store = MemoryStore::new();
        let mut draft = draft("robin");
        draft.shipping = Some(AddressChange::Existing(AddressId::new("missing")));

        let err = store.insert_order(draft).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.find_user(&UserId::new("robin")).await.unwrap().is_none());
        assert!(
            store
                .list_addresses(&UserId::new("robin"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_rechecks_locks() {
        let store = MemoryStore::new();
        let order = store.insert_order(draft("robin")).await.unwrap();
        store
            .set_payment_state(&order.id, PaymentState::Paid)
            .await
            .unwrap();

        let patch = OrderPatch {
            currency: Some("EUR".into()),
            data: vec![("gift".into(), DataValue::Bool(true))],
            ..Default::default()
        };
        let err = store.apply_order_update(&order.id, patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Locked(_)));

        let stored = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.currency, "USD");
        assert!(stored.data.is_empty());
        assert_eq!(stored.state, OrderState::Paid);
    }

    #[tokio::test]
    async fn test_update_upserts_data() {
        let store = MemoryStore::new();
        let order = store.insert_order(draft("robin")).await.unwrap();

        for value in [DataValue::Number(1.0), DataValue::String("fish".into())] {
            let patch = OrderPatch {
                data: vec![("thing".into(), value)],
                ..Default::default()
            };
            store.apply_order_update(&order.id, patch).await.unwrap();
        }

        let stored = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.data.len(), 1);
        assert_eq!(stored.data["thing"], DataValue::String("fish".into()));
    }

    #[tokio::test]
    async fn test_list_orders_is_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let first = store.insert_order(draft("robin")).await.unwrap();
        let second = store.insert_order(draft("robin")).await.unwrap();
        store.insert_order(draft("batgirl")).await.unwrap();

        let orders = store.list_orders(&UserId::new("robin")).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].created_at >= orders[1].created_at);
        let ids: Vec<_> = orders.iter().map(|o| o.id.clone()).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }
}
