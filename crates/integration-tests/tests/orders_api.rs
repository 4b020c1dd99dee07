//! HTTP tests for the order endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use storekeep_api::models::Address;
use storekeep_core::{AddressId, DataValue, FulfillmentState, OrderState, PaymentState, UserId};
use storekeep_integration_tests::{
    BRUCE, JOKER, SHIPPING_RATE, WAYNE_MANOR, admin_token, as_order, bruce_token, manor_fields,
    seed, send, send_raw, stored_order, stranger_token, token,
};

fn order_body() -> Value {
    json!({
        "session_id": "checkout-1",
        "currency": "USD",
        "vat_number": "DE123",
        "line_items": [
            {"sku": "cowl", "title": "Cowl", "type": "gear", "price": 1999, "quantity": 1, "vat": 19},
            {"sku": "cape", "title": "Cape", "type": "gear", "price": 4500, "quantity": 2, "vat": 0}
        ],
        "billing_address": {
            "last_name": "Wayne",
            "address1": "1007 Mountain Drive",
            "city": "Gotham",
            "country": "US",
            "zip": "10001"
        }
    })
}

// ----------------------------------------------------------------------------
// List
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_list_orders_as_the_user() {
    let data = seed().await;
    let (status, body) = send(data.app(), Method::GET, "/orders", Some(&bruce_token()), None).await;

    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    for order in orders {
        assert_eq!(order["user_id"], BRUCE);
        assert_eq!(order["line_items"].as_array().unwrap().len(), 2);
        assert_eq!(order["billing_address"]["id"], WAYNE_MANOR);
    }
}

#[tokio::test]
async fn test_list_orders_as_admin_with_filter() {
    let data = seed().await;
    let uri = format!("/orders?user_id={BRUCE}");
    let (status, body) = send(data.app(), Method::GET, &uri, Some(&admin_token()), None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&data.first_order.id.as_str()));
    assert!(ids.contains(&data.second_order.id.as_str()));
}

#[tokio::test]
async fn test_list_orders_as_stranger_is_empty() {
    let data = seed().await;
    let (status, body) =
        send(data.app(), Method::GET, "/orders", Some(&stranger_token()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_list_orders_filter_without_admin_rights() {
    let data = seed().await;
    let uri = format!("/orders?user_id={BRUCE}");
    let (status, body) = send(data.app(), Method::GET, &uri, Some(&stranger_token()), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_list_orders_without_token() {
    let data = seed().await;
    let (status, body) = send(data.app(), Method::GET, "/orders", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let data = seed().await;
    let (status, _) = send(data.app(), Method::GET, "/orders", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ----------------------------------------------------------------------------
// View
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_view_order_as_the_user() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let (status, body) = send(data.app(), Method::GET, &uri, Some(&bruce_token()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("user").is_none());
    let order = as_order(body);
    assert_eq!(order.id, data.first_order.id);
    assert_eq!(order.total, data.first_order.total);
    assert_eq!(order.line_items, data.first_order.line_items);
    assert_eq!(order.billing_address, data.wayne_manor);
}

#[tokio::test]
async fn test_view_order_as_admin() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.joker_order.id);
    let (status, body) = send(data.app(), Method::GET, &uri, Some(&admin_token()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], JOKER);
}

#[tokio::test]
async fn test_view_order_as_stranger() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let (status, _) = send(data.app(), Method::GET, &uri, Some(&stranger_token()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_view_missing_order() {
    let data = seed().await;
    let (status, body) = send(
        data.app(),
        Method::GET,
        "/orders/does-not-exist",
        Some(&stranger_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_view_order_without_token() {
    let data = seed().await;
    let (status, _) = send(data.app(), Method::GET, "/orders/does-not-exist", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ----------------------------------------------------------------------------
// Create
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_create_order_as_known_user() {
    let data = seed().await;
    let (status, body) = send(
        data.app(),
        Method::PUT,
        "/orders",
        Some(&bruce_token()),
        Some(&order_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let order = as_order(body);
    assert_eq!(order.user_id, Some(UserId::new(BRUCE)));
    assert_eq!(order.email.as_str(), "bruce@wayne.com");
    assert_eq!(order.subtotal, 10_999);
    assert_eq!(order.taxes, 380);
    assert_eq!(order.shipping, SHIPPING_RATE);
    assert_eq!(order.total, 10_999 + 380 + SHIPPING_RATE);
    assert_eq!(order.payment_state, PaymentState::Pending);
    assert_eq!(order.fulfillment_state, FulfillmentState::Pending);
    assert_eq!(order.state, OrderState::Pending);
    assert_eq!(order.shipping_address_id, order.billing_address_id);
    assert_eq!(order.billing_address.user_id, Some(UserId::new(BRUCE)));
    assert_eq!(order.vat_number, "DE123");

    let stored = stored_order(&data.store, &order.id).await;
    assert_eq!(stored.line_items.len(), 2);
    assert_eq!(stored.line_items[0].kind, "gear");
}

#[tokio::test]
async fn test_create_order_with_saved_address() {
    let data = seed().await;
    let mut body = order_body();
    body.as_object_mut().unwrap().remove("billing_address");
    body["billing_address_id"] = json!(WAYNE_MANOR);

    let (status, response) =
        send(data.app(), Method::PUT, "/orders", Some(&bruce_token()), Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["billing_address_id"], WAYNE_MANOR);
    assert_eq!(response["shipping_address_id"], WAYNE_MANOR);

    // Somebody else's saved address cannot be used.
    let (status, _) = send(
        data.app(),
        Method::PUT,
        "/orders",
        Some(&stranger_token()),
        Some(&body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_guest_order() {
    let data = seed().await;
    let mut body = order_body();
    body["email"] = json!("selina@kyle.com");

    let (status, response) = send(data.app(), Method::PUT, "/orders", None, Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user_id"], Value::Null);
    assert_eq!(response["email"], "selina@kyle.com");
}

#[tokio::test]
async fn test_create_guest_order_without_email() {
    let data = seed().await;
    let (status, _) = send(data.app(), Method::PUT, "/orders", None, Some(&order_body())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_for_new_user() {
    let data = seed().await;
    let mut body = order_body();
    body["email"] = json!("orders@gordon.com");
    let commissioner = token("jim-gordon", Some("jim@gcpd.org"), &[]);

    let (status, response) =
        send(data.app(), Method::PUT, "/orders", Some(&commissioner), Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user_id"], "jim-gordon");
    assert_eq!(response["email"], "orders@gordon.com");

    let (status, user) = send(
        data.app(),
        Method::GET,
        "/users/jim-gordon",
        Some(&commissioner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "jim@gcpd.org");
}

#[tokio::test]
async fn test_create_order_for_new_user_with_invalid_token_email() {
    let data = seed().await;
    let mut body = order_body();
    body["email"] = json!("joker@wayne.com");
    let newbie = token("newbie", Some("not-an-email"), &[]);

    let (status, response) =
        send(data.app(), Method::PUT, "/orders", Some(&newbie), Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["user_id"], "newbie");
    assert_eq!(response["email"], "joker@wayne.com");

    let (status, user) = send(data.app(), Method::GET, "/users/newbie", Some(&newbie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "joker@wayne.com");
}

#[tokio::test]
async fn test_create_order_validation() {
    let data = seed().await;
    let token = bruce_token();

    let mut no_currency = order_body();
    no_currency["currency"] = json!("");
    let mut no_items = order_body();
    no_items["line_items"] = json!([]);
    let mut no_sku = order_body();
    no_sku["line_items"][0]["sku"] = json!("");
    let mut negative_price = order_body();
    negative_price["line_items"][0]["price"] = json!(-1);
    let mut no_billing = order_body();
    no_billing.as_object_mut().unwrap().remove("billing_address");
    let mut bad_billing = order_body();
    bad_billing["billing_address"] = json!({"first_name": "Bruce"});
    let mut both_billing = order_body();
    both_billing["billing_address_id"] = json!(WAYNE_MANOR);

    for body in [
        no_currency,
        no_items,
        no_sku,
        negative_price,
        no_billing,
        bad_billing,
        both_billing,
    ] {
        let (status, _) =
            send(data.app(), Method::PUT, "/orders", Some(&token), Some(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_create_order_with_malformed_json() {
    let data = seed().await;
    let (status, body) = send_raw(
        data.app(),
        Method::PUT,
        "/orders",
        Some(&bruce_token()),
        Some("{\"currency\": ".into()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Could not read params")
    );
}

// ----------------------------------------------------------------------------
// Update
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_update_fields() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let body = json!({"email": "mrfreeze@dc.com", "currency": "monopoly-dollars"});

    let (status, response) =
        send(data.app(), Method::POST, &uri, Some(&bruce_token()), Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["email"], "mrfreeze@dc.com");
    assert_eq!(response["currency"], "monopoly-dollars");

    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert_eq!(saved.email.as_str(), "mrfreeze@dc.com");
    assert_eq!(saved.currency, "monopoly-dollars");
    assert_eq!(saved.total, data.first_order.total);
}

#[tokio::test]
async fn test_update_with_existing_address() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.joker_order.id);
    let (status, response) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&admin_token()),
        Some(&json!({"billing_address_id": data.joker_order.shipping_address_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["billing_address_id"],
        data.joker_order.shipping_address_id.as_str()
    );

    // Bruce's address does not belong to the Joker's order.
    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&admin_token()),
        Some(&json!({"billing_address_id": WAYNE_MANOR})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_with_new_address() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let mut fields = manor_fields();
    fields.address1 = "The Batcave".into();
    let body = json!({ "shipping_address": fields.clone() });

    let (status, response) =
        send(data.app(), Method::POST, &uri, Some(&bruce_token()), Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    let order = as_order(response);
    assert_ne!(order.shipping_address_id, AddressId::new(WAYNE_MANOR));
    assert_eq!(order.billing_address_id, AddressId::new(WAYNE_MANOR));

    let address_uri = format!("/users/{BRUCE}/addresses/{}", order.shipping_address_id);
    let (status, address) =
        send(data.app(), Method::GET, &address_uri, Some(&bruce_token()), None).await;
    assert_eq!(status, StatusCode::OK);
    let address: Address = serde_json::from_value(address).unwrap();
    assert_eq!(address.fields, fields);
    assert_eq!(address.user_id, Some(UserId::new(BRUCE)));
}

#[tokio::test]
async fn test_update_after_paid() {
    let data = seed().await;
    data.store
        .set_payment_state(&data.first_order.id, PaymentState::Paid)
        .await
        .unwrap();
    let uri = format!("/orders/{}", data.first_order.id);

    for body in [
        json!({"currency": "EUR"}),
        json!({"billing_address_id": WAYNE_MANOR}),
        json!({"billing_address": manor_fields()}),
    ] {
        let (status, _) =
            send(data.app(), Method::POST, &uri, Some(&bruce_token()), Some(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    }

    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert_eq!(saved.currency, "USD");
    assert_eq!(saved.state, OrderState::Paid);

    // Shipping is still open until fulfillment starts.
    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&bruce_token()),
        Some(&json!({"shipping_address": manor_fields()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_shipping_after_shipped() {
    let data = seed().await;
    data.store
        .set_fulfillment_state(&data.first_order.id, FulfillmentState::Shipped)
        .await
        .unwrap();
    let uri = format!("/orders/{}", data.first_order.id);

    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&bruce_token()),
        Some(&json!({"shipping_address_id": WAYNE_MANOR})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_as_stranger() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&stranger_token()),
        Some(&json!({"email": "mrfreeze@dc.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert_eq!(saved.email, data.first_order.email);
}

#[tokio::test]
async fn test_update_without_credentials() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);

    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        None,
        Some(&json!({"email": "mrfreeze@dc.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Credentials are checked before the body is read.
    let (status, _) = send_raw(data.app(), Method::POST, &uri, None, Some("{".into())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_missing_order() {
    let data = seed().await;
    let (status, _) = send(
        data.app(),
        Method::POST,
        "/orders/does-not-exist",
        Some(&admin_token()),
        Some(&json!({"currency": "EUR"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_with_malformed_json() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let (status, _) =
        send_raw(data.app(), Method::POST, &uri, Some(&bruce_token()), Some("{".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_with_new_data() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let body = json!({
        "data": {
            "thing": 1,
            "red": "fish",
            "other thing": 3.4,
            "exists": true
        }
    });

    let (status, response) =
        send(data.app(), Method::POST, &uri, Some(&bruce_token()), Some(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["red"], "fish");

    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert_eq!(saved.data.len(), 4);
    assert_eq!(saved.data["thing"], DataValue::Number(1.0));
    assert_eq!(saved.data["red"], DataValue::String("fish".into()));
    assert_eq!(saved.data["other thing"], DataValue::Number(3.4));
    assert_eq!(saved.data["exists"], DataValue::Bool(true));

    // A second write replaces the value and its type.
    let (status, _) = send(
        data.app(),
        Method::POST,
        &uri,
        Some(&bruce_token()),
        Some(&json!({"data": {"thing": "one"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert_eq!(saved.data.len(), 4);
    assert_eq!(saved.data["thing"], DataValue::String("one".into()));
}

#[tokio::test]
async fn test_update_with_bad_data() {
    let data = seed().await;
    let uri = format!("/orders/{}", data.first_order.id);
    let body = json!({"data": {"fine": "value", "array": [4]}});

    let (status, _) =
        send(data.app(), Method::POST, &uri, Some(&bruce_token()), Some(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let saved = stored_order(&data.store, &data.first_order.id).await;
    assert!(saved.data.is_empty());
}
