//! Malformed requests get the JSON error body like every other failure.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};

use storekeep_integration_tests::{admin_token, bruce_token, seed, send};

#[tokio::test]
async fn test_repeated_query_param_is_json_bad_request() {
    let data = seed().await;
    let (status, body) = send(
        data.app(),
        Method::GET,
        "/orders?user_id=a&user_id=b",
        Some(&admin_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query string")
    );

    let (status, body) = send(
        data.app(),
        Method::GET,
        "/users?email=a@wayne.com&email=b@wayne.com",
        Some(&admin_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_invalid_path_param_is_json_bad_request() {
    let data = seed().await;
    let (status, body) = send(
        data.app(),
        Method::GET,
        "/orders/%FF",
        Some(&bruce_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid path"));
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let data = seed().await;
    let (status, body) = send(
        data.app(),
        Method::GET,
        "/orders/x/y",
        Some(&bruce_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "No route for /orders/x/y");

    let (status, body) = send(data.app(), Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}
