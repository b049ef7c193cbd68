//! Axum extractors for authentication

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use toolgate_types::AccountId;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated account extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_bearer(parts)?;

        let claims = app_state.tokens.verify(token)?;

        Ok(Self {
            account_id: claims.account_id(),
            email: claims.email,
        })
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(parts: &Parts) -> Result<&str, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?;

    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::MissingToken),
    }
}
