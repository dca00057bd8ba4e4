//! Bearer-token authentication extractor.
//!
//! A missing `Authorization` header is 401; a present but invalid or
//! expired token is 403. The extractor only validates the signature
//! and expiry; it does not hit the database, so a deleted user can
//! still carry a valid token until it expires (handlers that need the
//! row look it up and 404).

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use booknest_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(AuthUser(user_id): AuthUser) -> impl IntoResponse {
///     format!("Hello, user {user_id}!")
/// }
/// ```
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingToken)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::MissingToken)?;

        let user_id = state
            .tokens()
            .verify_access(token)
            .map_err(|_| ApiError::InvalidToken)?;

        Ok(Self(user_id))
    }
}
