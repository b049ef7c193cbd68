//! Error types for the Entitlement API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use toolgate_types::api::{
    ErrorResponse, CODE_BAD_REQUEST, CODE_INTERNAL_ERROR, CODE_INVALID_TOKEN, CODE_LIMIT_REACHED,
    CODE_MISSING_TOKEN,
};

use crate::auth::AuthError;
use crate::store::StoreError;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No authentication token provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Tool usage limit reached")]
    LimitReached,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error")]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::LimitReached => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken => CODE_MISSING_TOKEN,
            Self::InvalidToken => CODE_INVALID_TOKEN,
            Self::LimitReached => CODE_LIMIT_REACHED,
            Self::BadRequest(_) => CODE_BAD_REQUEST,
            Self::Internal(_) | Self::Store(_) => CODE_INTERNAL_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::TokenExpired => Self::InvalidToken,
            AuthError::Signing(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors
        if matches!(self, Self::Internal(_) | Self::Store(_)) {
            tracing::error!(error = ?self, "Internal API error");
        }

        let body = ErrorResponse::new(code, self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
