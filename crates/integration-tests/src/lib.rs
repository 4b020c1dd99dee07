//! Integration test fixtures for Storekeep.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storekeep-integration-tests
//! ```
//!
//! Every test builds its own router over a freshly seeded
//! [`MemoryStore`]. The seed contains:
//!
//! - Bruce (`i-am-batman`) with one saved address and two orders
//! - The Joker with one order and its inline address
//! - Robin, a user without addresses or orders

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storekeep_api::config::{ApiConfig, JwtConfig, PricingConfig};
use storekeep_api::db::{MemoryStore, Store};
use storekeep_api::models::{
    Address, AddressChange, AddressFields, NewAddress, NewLineItem, Order, OrderDraft, User,
};
use storekeep_api::routes;
use storekeep_api::state::AppState;
use storekeep_core::{AddressId, Email, OrderId, OrderTotals, UserId};

/// HS256 secret shared by the test config and minted tokens.
pub const SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";
pub const ADMIN_GROUP: &str = "admin";

/// Flat shipping rate configured for tests.
pub const SHIPPING_RATE: i64 = 500;

pub const BRUCE: &str = "i-am-batman";
pub const JOKER: &str = "joker";
pub const ROBIN: &str = "robin";
pub const WAYNE_MANOR: &str = "wayne-manor";

/// Seeded store plus the records tests assert against.
pub struct TestData {
    pub store: Arc<MemoryStore>,
    pub bruce: User,
    pub wayne_manor: Address,
    pub first_order: Order,
    pub second_order: Order,
    pub joker_order: Order,
}

impl TestData {
    /// Router over this data's store.
    #[must_use]
    pub fn app(&self) -> Router {
        routes::app(AppState::new(test_config(), self.store.clone()))
    }
}

#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost/storekeep_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        jwt: JwtConfig {
            secret: SecretString::from(SECRET),
            audience: None,
            admin_group: ADMIN_GROUP.to_string(),
        },
        pricing: PricingConfig {
            shipping_rate: SHIPPING_RATE,
        },
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

#[must_use]
pub fn manor_fields() -> AddressFields {
    AddressFields {
        first_name: "Bruce".into(),
        last_name: "Wayne".into(),
        company: "Wayne Enterprises".into(),
        address1: "1007 Mountain Drive".into(),
        city: "Gotham".into(),
        country: "US".into(),
        state: "NJ".into(),
        zip: "10001".into(),
        ..Default::default()
    }
}

fn line_items() -> Vec<NewLineItem> {
    vec![
        NewLineItem {
            sku: "utility-belt".into(),
            title: "Utility Belt".into(),
            kind: "gear".into(),
            price: 1000,
            quantity: 2,
            vat: 19,
            path: "/gear/utility-belt".into(),
            ..Default::default()
        },
        NewLineItem {
            sku: "batarang".into(),
            title: "Batarang".into(),
            kind: "gear".into(),
            price: 250,
            quantity: 4,
            vat: 7,
            path: "/gear/batarang".into(),
            ..Default::default()
        },
    ]
}

fn draft(user: &User, billing: AddressChange, session: &str) -> OrderDraft {
    let line_items = line_items();
    let totals = OrderTotals::compute(line_items.iter().map(NewLineItem::amount), SHIPPING_RATE)
        .expect("fixture totals");
    OrderDraft {
        id: OrderId::generate(),
        new_user: None,
        user_id: Some(user.id.clone()),
        session_id: session.into(),
        email: user.email.clone(),
        currency: "USD".into(),
        vat_number: String::new(),
        totals,
        billing,
        shipping: None,
        line_items,
    }
}

fn user(id: &str, email: &str) -> User {
    User {
        id: UserId::new(id),
        email: Email::parse(email).expect("fixture email"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Build a freshly seeded store.
///
/// # Panics
///
/// Panics if the fixtures cannot be written, which means the store is broken.
pub async fn seed() -> TestData {
    let store = Arc::new(MemoryStore::new());

    let bruce = user(BRUCE, "bruce@wayne.com");
    let joker = user(JOKER, "joker@arkham.org");
    for u in [&bruce, &joker, &user(ROBIN, "robin@wayne.com")] {
        store.insert_user(u.clone()).await;
    }

    let wayne_manor = Address {
        id: AddressId::new(WAYNE_MANOR),
        user_id: Some(bruce.id.clone()),
        fields: manor_fields(),
        created_at: Utc::now(),
    };
    store.insert_address(wayne_manor.clone()).await;

    let manor = || AddressChange::Existing(wayne_manor.id.clone());
    let first_order = store
        .insert_order(draft(&bruce, manor(), "first"))
        .await
        .expect("first order");
    let second_order = store
        .insert_order(draft(&bruce, manor(), "second"))
        .await
        .expect("second order");

    let funhouse = NewAddress::new(
        Some(joker.id.clone()),
        AddressFields {
            last_name: "Joker".into(),
            address1: "Amusement Mile".into(),
            city: "Gotham".into(),
            country: "US".into(),
            zip: "10666".into(),
            ..Default::default()
        },
    )
    .expect("fixture address");
    let joker_order = store
        .insert_order(draft(&joker, AddressChange::Create(funhouse), "joker"))
        .await
        .expect("joker order");

    TestData {
        store,
        bruce,
        wayne_manor,
        first_order,
        second_order,
        joker_order,
    }
}

/// Mint an HS256 token valid for an hour.
///
/// # Panics
///
/// Panics if encoding fails.
#[must_use]
pub fn token(sub: &str, email: Option<&str>, groups: &[&str]) -> String {
    let mut claims = json!({
        "sub": sub,
        "groups": groups,
        "exp": jsonwebtoken::get_current_timestamp() + 3600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// Token for Bruce, the owner of the seeded orders.
#[must_use]
pub fn bruce_token() -> String {
    token(BRUCE, Some("bruce@wayne.com"), &[])
}

/// Token for an admin who owns nothing.
#[must_use]
pub fn admin_token() -> String {
    token("alfred", Some("alfred@wayne.com"), &[ADMIN_GROUP])
}

/// Token for a known user who owns none of Bruce's data.
#[must_use]
pub fn stranger_token() -> String {
    token(ROBIN, Some("robin@wayne.com"), &["sidekicks"])
}

/// Send a request through the router and decode the response.
///
/// Bodies that are not JSON come back as [`Value::String`].
///
/// # Panics
///
/// Panics if the request cannot be built or the body cannot be read.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    send_raw(app, method, uri, token, body.map(Value::to_string)).await
}

/// Like [`send`] but with a raw body, for malformed payloads.
///
/// # Panics
///
/// Panics if the request cannot be built or the body cannot be read.
pub async fn send_raw(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = request
        .body(body.map_or_else(Body::empty, Body::from))
        .expect("build request");

    let response = app.oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

/// Decode a JSON response into an [`Order`].
///
/// # Panics
///
/// Panics if the value is not an order.
#[must_use]
pub fn as_order(value: Value) -> Order {
    serde_json::from_value(value).expect("order JSON")
}

/// Read an order straight from the store.
///
/// # Panics
///
/// Panics if the order is missing.
pub async fn stored_order(store: &MemoryStore, id: &OrderId) -> Order {
    store
        .find_order(id)
        .await
        .expect("store read")
        .expect("order exists")
}
