//! Order endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::Deserialize;

use storekeep_core::{OrderId, UserId};

use crate::error::Result;
use crate::middleware::OptionalClaims;
use crate::models::Order;
use crate::services::{CreateOrderRequest, UpdateOrderRequest};
use crate::state::AppState;

/// Query parameters for the order list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
}

/// `GET /orders`
pub async fn list(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Order>>> {
    let Query(query) = query?;
    let filter = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .map(UserId::new);

    let orders = state.orders().list(claims.as_ref(), filter.as_ref()).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = path?;
    let order = state.orders().get(claims.as_ref(), &OrderId::new(id)).await?;
    Ok(Json(order))
}

/// `PUT /orders`
pub async fn create(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(request) = body?;
    let order = state.orders().create(claims.as_ref(), request).await?;
    Ok(Json(order))
}

/// `POST /orders/{id}`
pub async fn update(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = path?;
    let orders = state.orders();
    let order = orders.get(claims.as_ref(), &OrderId::new(id)).await?;

    let Json(request) = body?;
    let updated = orders.update(&order, request).await?;
    Ok(Json(updated))
}
