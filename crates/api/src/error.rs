//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, ApiError>`. The response body
//! is always `{ "message": ... }` JSON; server-side failures are
//! captured to Sentry before responding and never leak details to the
//! client.
//!
//! Status mapping: 400 validation, 401 missing bearer token, 403
//! invalid/expired token, 404 unknown resource, 500 internal, 502
//! catalog upstream failure, 503 store unavailable.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog gateway failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No bearer token on a protected route.
    #[error("Unauthorized: missing token")]
    MissingToken,

    /// Bearer token present but invalid or expired.
    #[error("Forbidden: invalid token")]
    InvalidToken,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status for repository failures: pool exhaustion and connection loss
/// are a degraded-store 503, not a 500.
const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::PasswordHash | AuthError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Repository(repo) => repository_status(repo),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Cart(err) => match err {
                CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::Repository(repo) => repository_status(repo),
                CartError::InvalidItem(_) | CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Repository(repo) => repository_status(repo),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Http(_) | CatalogError::Upstream(_) => StatusCode::BAD_GATEWAY,
            },
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InvalidToken => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Validation errors pass through their
    /// Display text; server-side failures get a generic message.
    fn message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
            StatusCode::BAD_GATEWAY => "Catalog service unavailable".to_string(),
            _ => match self {
                Self::Database(err) => err.to_string(),
                Self::Auth(err) => err.to_string(),
                Self::Cart(err) => err.to_string(),
                Self::Checkout(err) => err.to_string(),
                Self::Catalog(err) => err.to_string(),
                Self::MissingToken => "Authentication token required".to_string(),
                Self::InvalidToken => "Invalid or expired token".to_string(),
                Self::NotFound(what) => format!("{what} not found"),
                Self::BadRequest(msg) | Self::Internal(msg) => msg.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "message": self.message() }))).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;
