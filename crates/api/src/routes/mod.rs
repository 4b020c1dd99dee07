//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (store ping)
//!
//! # Orders
//! GET  /orders[?user_id=…]              - Orders of the caller (or user, admin)
//! PUT  /orders                          - Place an order (guest checkout allowed)
//! GET  /orders/{id}                     - Order detail
//! POST /orders/{id}                     - Partial update
//!
//! # Users (self or admin)
//! GET  /users[?email=…]                 - User list (admin only)
//! GET  /users/{user_id}                 - User detail
//! GET  /users/{user_id}/addresses       - Saved addresses
//! GET  /users/{user_id}/addresses/{id}  - Saved address detail
//! ```

pub mod health;
pub mod orders;
pub mod users;

use axum::{Router, http::Uri, middleware::from_fn, routing::get};

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the API routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list).put(orders::create))
        .route("/orders/{id}", get(orders::show).post(orders::update))
        .route("/users", get(users::list))
        .route("/users/{user_id}", get(users::show))
        .route("/users/{user_id}/addresses", get(users::addresses))
        .route("/users/{user_id}/addresses/{id}", get(users::address))
}

/// Build the application router with health checks and request IDs.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .fallback(not_found)
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// JSON 404 for unmatched paths.
async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
