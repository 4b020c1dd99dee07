//! Bearer token extractor.
//!
//! Every route accepts anonymous callers at the extraction stage; services
//! decide whether the missing [`Claims`] are acceptable. A token that is
//! present but fails verification is always rejected.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::Claims;
use crate::state::AppState;

/// Extractor for the caller's verified claims, if a token was sent.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalClaims(claims): OptionalClaims) -> Result<Json<Order>> {
///     state.orders().get(claims.as_ref(), &id).await.map(Json)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| {
                AppError::Unauthorized("Authorization header must be a bearer token".to_string())
            })?;

        let claims = state.verifier().verify(token)?;
        set_sentry_user(&claims.sub, claims.email());
        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(Self(Some(claims)))
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
