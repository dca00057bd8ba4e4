//! Account/profile route handlers.

use axum::extract::State;

use crate::db::users::UserRepository;
use crate::error::{ApiError, Result};
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::models::user::ProfileUpdate;
use crate::state::AppState;

/// GET /api/users/me
pub async fn me(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> Result<Json<User>> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
    Ok(Json(user))
}

/// PATCH /api/users/me
///
/// Updates only the supplied profile fields; credentials are not
/// editable here.
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("no profile fields to update".to_string()));
    }

    let users = UserRepository::new(state.pool());
    let user = users.update_profile(user_id, &update).await?;
    Ok(Json(user))
}
