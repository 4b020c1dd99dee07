//! Order listing, viewing, creation and updates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use storekeep_core::{AddressId, DataValue, Email, OrderId, OrderTotals, UserId};

use super::order_email::resolve_order_email;
use super::policy::{AccessPolicy, Denial};
use crate::config::PricingConfig;
use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};
use crate::models::{
    AddressChange, AddressFields, Claims, NewAddress, NewLineItem, Order, OrderDraft, OrderPatch,
};

/// Body of `PUT /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrderRequest {
    pub session_id: String,
    pub email: String,
    pub currency: String,
    pub vat_number: String,
    pub line_items: Vec<NewLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<AddressFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressFields>,
}

/// Body of `POST /orders/{id}`. Absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<AddressFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Order operations, gated by the access policy.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    policy: &'a AccessPolicy,
    pricing: PricingConfig,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: &'a AccessPolicy, pricing: PricingConfig) -> Self {
        Self {
            store,
            policy,
            pricing,
        }
    }

    /// List orders of the caller, or of `filter` when the caller may see them.
    ///
    /// # Errors
    ///
    /// Unauthorized without claims; bad request when filtering by another
    /// user without admin rights.
    #[instrument(skip(self, claims))]
    pub async fn list(&self, claims: Option<&Claims>, filter: Option<&UserId>) -> Result<Vec<Order>> {
        let claims = claims.ok_or(Denial::Unauthenticated)?;

        let target = match filter {
            Some(user_id) => {
                self.policy
                    .authorize(Some(claims), Some(user_id))
                    .map_err(|_| {
                        AppError::BadRequest(
                            "Only admins may list orders of other users".to_string(),
                        )
                    })?;
                user_id.clone()
            }
            None => claims.user_id(),
        };

        let orders = self.store.list_orders(&target).await?;
        tracing::debug!(user_id = %target, count = orders.len(), "Listed orders");
        Ok(orders)
    }

    /// Fetch one order visible to the caller.
    ///
    /// # Errors
    ///
    /// Unauthorized without claims (the store is not consulted), not found
    /// for unknown IDs, unauthorized for callers who are neither owner nor
    /// admin.
    #[instrument(skip(self, claims), fields(order_id = %id))]
    pub async fn get(&self, claims: Option<&Claims>, id: &OrderId) -> Result<Order> {
        let claims = claims.ok_or(Denial::Unauthenticated)?;

        let order = self.load(id).await?;
        self.policy.authorize(Some(claims), order.user_id.as_ref())?;
        Ok(order)
    }

    /// Place a new order, creating the user and addresses it needs.
    ///
    /// # Errors
    ///
    /// Bad request for a missing currency, empty or invalid line items,
    /// unresolvable email, or a missing, foreign or invalid address.
    #[instrument(skip(self, claims, request), fields(session_id = %request.session_id))]
    pub async fn create(&self, claims: Option<&Claims>, request: CreateOrderRequest) -> Result<Order> {
        let currency = request.currency.trim();
        if currency.is_empty() {
            return Err(AppError::BadRequest("Currency is required".to_string()));
        }
        if request.line_items.is_empty() {
            return Err(AppError::BadRequest(
                "An order needs at least one line item".to_string(),
            ));
        }
        if request.line_items.iter().any(|item| item.sku.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "Every line item needs a sku".to_string(),
            ));
        }
        let totals = OrderTotals::compute(
            request.line_items.iter().map(NewLineItem::amount),
            self.pricing.shipping_rate,
        )
        .map_err(|e| AppError::BadRequest(format!("Invalid line items: {e}")))?;

        let existing_user = match claims {
            Some(claims) => self.store.find_user(&claims.user_id()).await?,
            None => None,
        };
        let resolution =
            resolve_order_email(claims, existing_user.as_ref(), Some(request.email.as_str()))?;
        let owner = resolution.user_id.as_ref();

        let billing = self
            .address_change(
                "billing",
                request.billing_address_id,
                request.billing_address,
                owner,
            )
            .await?
            .ok_or_else(|| AppError::BadRequest("A billing address is required".to_string()))?;
        let shipping = self
            .address_change(
                "shipping",
                request.shipping_address_id,
                request.shipping_address,
                owner,
            )
            .await?;

        let draft = OrderDraft {
            id: OrderId::generate(),
            new_user: resolution.new_user,
            user_id: resolution.user_id,
            session_id: request.session_id,
            email: resolution.email,
            currency: currency.to_owned(),
            vat_number: request.vat_number,
            totals,
            billing,
            shipping,
            line_items: request.line_items,
        };

        let order = self.store.insert_order(draft).await.map_err(write_error)?;
        tracing::info!(
            order_id = %order.id,
            user_id = ?order.user_id,
            total = order.total,
            "Order created"
        );
        Ok(order)
    }

    /// Apply a partial update to `order`.
    ///
    /// The caller must already have been authorized for the order through
    /// [`OrderService::get`], so that 401 and 404 take precedence over a
    /// malformed body.
    ///
    /// # Errors
    ///
    /// Bad request for invalid fields or changes the order's state forbids.
    #[instrument(skip(self, order, request), fields(order_id = %order.id))]
    pub async fn update(&self, order: &Order, request: UpdateOrderRequest) -> Result<Order> {
        let email = non_blank(request.email)
            .map(|email| Email::parse(&email))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;

        let data = request
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| DataValue::from_json(&key, &value).map(|value| (key, value)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let owner = order.user_id.as_ref();
        let billing = self
            .address_change(
                "billing",
                request.billing_address_id,
                request.billing_address,
                owner,
            )
            .await?;
        let shipping = self
            .address_change(
                "shipping",
                request.shipping_address_id,
                request.shipping_address,
                owner,
            )
            .await?;

        let patch = OrderPatch {
            email,
            currency: non_blank(request.currency),
            billing,
            shipping,
            data,
        };
        patch
            .check_locks(order.payment_state, order.fulfillment_state)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let updated = self
            .store
            .apply_order_update(&order.id, patch)
            .await
            .map_err(write_error)?;
        tracing::info!(order_id = %updated.id, "Order updated");
        Ok(updated)
    }

    async fn load(&self, id: &OrderId) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
    }

    /// Turn the ID-or-inline pair for one address slot into a change.
    async fn address_change(
        &self,
        slot: &str,
        id: Option<String>,
        inline: Option<AddressFields>,
        owner: Option<&UserId>,
    ) -> Result<Option<AddressChange>> {
        match (non_blank(id), inline) {
            (Some(_), Some(_)) => Err(AppError::BadRequest(format!(
                "Provide either {slot}_address_id or {slot}_address, not both"
            ))),
            (Some(id), None) => {
                let id = AddressId::new(id);
                let address = self.store.find_address(&id).await?.ok_or_else(|| {
                    AppError::BadRequest(format!("Unknown {slot} address {id}"))
                })?;
                if !address.belongs_to(owner) {
                    return Err(AppError::BadRequest(format!(
                        "The {slot} address {id} does not belong to the order's user"
                    )));
                }
                Ok(Some(AddressChange::Existing(id)))
            }
            (None, Some(fields)) => {
                let address = NewAddress::new(owner.cloned(), fields)
                    .map_err(|e| AppError::BadRequest(format!("Invalid {slot} address: {e}")))?;
                Ok(Some(AddressChange::Create(address)))
            }
            (None, None) => Ok(None),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Map store write failures onto client-facing errors.
fn write_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Locked(violation) => AppError::BadRequest(violation.to_string()),
        RepositoryError::Conflict(message) => AppError::BadRequest(message),
        RepositoryError::NotFound => AppError::NotFound("Order not found".to_string()),
        other => AppError::Database(other),
    }
}
