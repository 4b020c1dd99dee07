//! User and address endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::Deserialize;

use storekeep_core::{AddressId, UserId};

use crate::error::Result;
use crate::middleware::OptionalClaims;
use crate::models::{Address, User};
use crate::state::AppState;

/// Query parameters for the user list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub email: Option<String>,
}

/// `GET /users`
pub async fn list(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>> {
    let Query(query) = query?;
    let users = state
        .users()
        .list(claims.as_ref(), query.email.as_deref())
        .await?;
    Ok(Json(users))
}

/// `GET /users/{user_id}`
pub async fn show(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<User>> {
    let Path(user_id) = path?;
    let user = state
        .users()
        .get(claims.as_ref(), &UserId::new(user_id))
        .await?;
    Ok(Json(user))
}

/// `GET /users/{user_id}/addresses`
pub async fn addresses(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<Address>>> {
    let Path(user_id) = path?;
    let addresses = state
        .users()
        .addresses(claims.as_ref(), &UserId::new(user_id))
        .await?;
    Ok(Json(addresses))
}

/// `GET /users/{user_id}/addresses/{id}`
pub async fn address(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Address>> {
    let Path((user_id, id)) = path?;
    let address = state
        .users()
        .address(claims.as_ref(), &UserId::new(user_id), &AddressId::new(id))
        .await?;
    Ok(Json(address))
}
