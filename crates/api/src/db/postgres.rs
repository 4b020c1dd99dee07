//! `PostgreSQL` store.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use storekeep_core::{
    AddressId, DataValue, Email, LineItemId, OrderId, OrderTotals, UserId,
};

use super::record::OrderRecord;
use super::{RepositoryError, Store};
use crate::models::{
    Address, AddressChange, AddressFields, LineItem, NewAddress, Order, OrderDraft, OrderPatch,
    User,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach addresses, line items and metadata to order rows.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let records = rows
            .into_iter()
            .map(OrderRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let order_ids: Vec<String> = records.iter().map(|r| r.id.to_string()).collect();
        let address_ids: Vec<String> = records
            .iter()
            .flat_map(|r| [r.billing_address_id.to_string(), r.shipping_address_id.to_string()])
            .collect();

        let addresses: HashMap<AddressId, Address> = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, first_name, last_name, company, address1, address2,
                   city, country, state, zip, created_at
            FROM addresses
            WHERE id = ANY($1)
            ",
        )
        .bind(address_ids.as_slice())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            let address = Address::from(row);
            (address.id.clone(), address)
        })
        .collect();

        let mut line_items: HashMap<OrderId, Vec<LineItem>> = HashMap::new();
        let rows = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT id, order_id, sku, title, description, type, price, quantity, vat, path
            FROM line_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(order_ids.as_slice())
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            let item = LineItem::from(row);
            line_items.entry(item.order_id.clone()).or_default().push(item);
        }

        let mut data: HashMap<OrderId, BTreeMap<String, DataValue>> = HashMap::new();
        let rows = sqlx::query_as::<_, DataRow>(
            r"
            SELECT order_id, key, type, string_value, numeric_value, bool_value
            FROM order_data
            WHERE order_id = ANY($1)
            ",
        )
        .bind(order_ids.as_slice())
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            let value = DataValue::from_columns(
                &row.data_type,
                row.string_value,
                row.numeric_value,
                row.bool_value,
            )
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
            data.entry(row.order_id).or_default().insert(row.key, value);
        }

        records
            .into_iter()
            .map(|record| {
                let billing = lookup_address(&addresses, &record.billing_address_id, &record.id)?;
                let shipping = lookup_address(&addresses, &record.shipping_address_id, &record.id)?;
                let items = line_items.remove(&record.id).unwrap_or_default();
                let values = data.remove(&record.id).unwrap_or_default();
                Ok(record.into_order(billing, shipping, items, values))
            })
            .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, email: Option<&str>) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, created_at, updated_at
            FROM users
            WHERE ($1::TEXT IS NULL OR email = $1)
            ORDER BY created_at, id
            ",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn list_addresses(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, first_name, last_name, company, address1, address2,
                   city, country, state, zip, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn find_address(&self, id: &AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, first_name, last_name, company, address1, address2,
                   city, country, state, zip, created_at
            FROM addresses
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, session_id, email, currency, subtotal, taxes, shipping, total,
                   payment_state, fulfillment_state, state, billing_address_id,
                   shipping_address_id, vat_number, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, session_id, email, currency, subtotal, taxes, shipping, total,
                   payment_state, fulfillment_state, state, billing_address_id,
                   shipping_address_id, vat_number, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    #[instrument(skip(self, draft), fields(order_id = %draft.id))]
    async fn insert_order(&self, draft: OrderDraft) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(user) = &draft.new_user {
            sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
                .bind(&user.id)
                .bind(&user.email)
                .execute(&mut *tx)
                .await?;
            tracing::info!(user_id = %user.id, "Created user for first order");
        }

        let billing_id = apply_address(&mut tx, &draft.billing).await?;
        let shipping_id = match &draft.shipping {
            Some(change) => apply_address(&mut tx, change).await?,
            None => billing_id.clone(),
        };

        sqlx::query(
            r"
            INSERT INTO orders (
                id, user_id, session_id, email, currency, subtotal, taxes, shipping, total,
                billing_address_id, shipping_address_id, vat_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(&draft.id)
        .bind(draft.user_id.as_ref())
        .bind(&draft.session_id)
        .bind(&draft.email)
        .bind(&draft.currency)
        .bind(draft.totals.subtotal)
        .bind(draft.totals.taxes)
        .bind(draft.totals.shipping)
        .bind(draft.totals.total)
        .bind(&billing_id)
        .bind(&shipping_id)
        .bind(&draft.vat_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_violation(e, "order conflicts with existing rows"))?;

        for item in &draft.line_items {
            sqlx::query(
                r"
                INSERT INTO line_items (order_id, sku, title, description, type, price, quantity, vat, path)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(&draft.id)
            .bind(&item.sku)
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.kind)
            .bind(item.price)
            .bind(item.quantity)
            .bind(item.vat)
            .bind(&item.path)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_order(&draft.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, patch), fields(order_id = %id))]
    async fn apply_order_update(
        &self,
        id: &OrderId,
        patch: OrderPatch,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, session_id, email, currency, subtotal, taxes, shipping, total,
                   payment_state, fulfillment_state, state, billing_address_id,
                   shipping_address_id, vat_number, created_at, updated_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        let record = OrderRecord::try_from(row)?;

        patch.check_locks(record.payment_state, record.fulfillment_state)?;

        let billing_id = match &patch.billing {
            Some(change) => Some(apply_address(&mut tx, change).await?),
            None => None,
        };
        let shipping_id = match &patch.shipping {
            Some(change) => Some(apply_address(&mut tx, change).await?),
            None => None,
        };

        sqlx::query(
            r"
            UPDATE orders
            SET email = COALESCE($2, email),
                currency = COALESCE($3, currency),
                billing_address_id = COALESCE($4, billing_address_id),
                shipping_address_id = COALESCE($5, shipping_address_id),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(patch.email.as_ref())
        .bind(patch.currency.as_ref())
        .bind(billing_id.as_ref())
        .bind(shipping_id.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_violation(e, "order references a missing address"))?;

        for (key, value) in &patch.data {
            let (string_value, numeric_value, bool_value) = match value {
                DataValue::String(s) => (Some(s.as_str()), None, None),
                DataValue::Number(n) => (None, Some(*n), None),
                DataValue::Bool(b) => (None, None, Some(*b)),
            };

            sqlx::query(
                r"
                INSERT INTO order_data (order_id, key, type, string_value, numeric_value, bool_value)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (order_id, key) DO UPDATE
                SET type = EXCLUDED.type,
                    string_value = EXCLUDED.string_value,
                    numeric_value = EXCLUDED.numeric_value,
                    bool_value = EXCLUDED.bool_value
                ",
            )
            .bind(id)
            .bind(key)
            .bind(value.data_type().as_str())
            .bind(string_value)
            .bind(numeric_value)
            .bind(bool_value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_order(id).await?.ok_or(RepositoryError::NotFound)
    }
}

/// Insert the address if the change creates one; return the ID to reference.
async fn apply_address(
    conn: &mut PgConnection,
    change: &AddressChange,
) -> Result<AddressId, RepositoryError> {
    match change {
        AddressChange::Existing(id) => Ok(id.clone()),
        AddressChange::Create(address) => {
            insert_address(conn, address).await?;
            Ok(address.id.clone())
        }
    }
}

async fn insert_address(
    conn: &mut PgConnection,
    address: &NewAddress,
) -> Result<(), RepositoryError> {
    let fields = &address.fields;
    sqlx::query(
        r"
        INSERT INTO addresses (
            id, user_id, first_name, last_name, company, address1, address2,
            city, country, state, zip
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(&address.id)
    .bind(address.user_id.as_ref())
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(&fields.company)
    .bind(&fields.address1)
    .bind(&fields.address2)
    .bind(&fields.city)
    .bind(&fields.country)
    .bind(&fields.state)
    .bind(&fields.zip)
    .execute(conn)
    .await
    .map_err(|e| map_constraint_violation(e, "address conflicts with existing rows"))?;
    Ok(())
}

fn map_constraint_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn lookup_address(
    addresses: &HashMap<AddressId, Address>,
    id: &AddressId,
    order_id: &OrderId,
) -> Result<Address, RepositoryError> {
    addresses.get(id).cloned().ok_or_else(|| {
        RepositoryError::DataCorruption(format!("order {order_id} references missing address {id}"))
    })
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: Option<UserId>,
    first_name: String,
    last_name: String,
    company: String,
    address1: String,
    address2: String,
    city: String,
    country: String,
    state: String,
    zip: String,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            fields: AddressFields {
                first_name: row.first_name,
                last_name: row.last_name,
                company: row.company,
                address1: row.address1,
                address2: row.address2,
                city: row.city,
                country: row.country,
                state: row.state,
                zip: row.zip,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    session_id: String,
    email: String,
    currency: String,
    subtotal: i64,
    taxes: i64,
    shipping: i64,
    total: i64,
    payment_state: String,
    fulfillment_state: String,
    state: String,
    billing_address_id: AddressId,
    shipping_address_id: AddressId,
    vat_number: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        };

        let email = Email::parse(&row.email).map_err(|e| corrupt(&e))?;
        let payment_state = row.payment_state.parse().map_err(|e| corrupt(&e))?;
        let fulfillment_state = row.fulfillment_state.parse().map_err(|e| corrupt(&e))?;
        let state = row.state.parse().map_err(|e| corrupt(&e))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            email,
            currency: row.currency,
            totals: OrderTotals {
                subtotal: row.subtotal,
                taxes: row.taxes,
                shipping: row.shipping,
                total: row.total,
            },
            payment_state,
            fulfillment_state,
            state,
            billing_address_id: row.billing_address_id,
            shipping_address_id: row.shipping_address_id,
            vat_number: row.vat_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    id: i64,
    order_id: OrderId,
    sku: String,
    title: String,
    description: String,
    #[sqlx(rename = "type")]
    kind: String,
    price: i64,
    quantity: i32,
    vat: i32,
    path: String,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: LineItemId::new(row.id),
            order_id: row.order_id,
            sku: row.sku,
            title: row.title,
            description: row.description,
            kind: row.kind,
            price: row.price,
            quantity: row.quantity,
            vat: row.vat,
            path: row.path,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DataRow {
    order_id: OrderId,
    key: String,
    #[sqlx(rename = "type")]
    data_type: String,
    string_value: Option<String>,
    numeric_value: Option<f64>,
    bool_value: Option<bool>,
}
