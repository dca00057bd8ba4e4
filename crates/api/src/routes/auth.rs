//! Authentication route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/signup
///
/// Creates the account and fires the verification email off the
/// request path; a mail failure is logged, never surfaced.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let signup = auth
        .signup(&body.username, &body.email, &body.password, &body.full_name)
        .await?;

    let link = format!(
        "{}/api/auth/verify/{}",
        state.config().base_url.trim_end_matches('/'),
        signup.verification_token
    );
    if let Some(mailer) = state.mailer() {
        let mailer = mailer.clone();
        let to = signup.user.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_verification(&to, &link).await {
                warn!(error = %e, "verification email delivery failed");
            }
        });
    } else {
        warn!(user_id = %signup.user.id, "no mailer configured, verification email skipped");
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created. Check your email to verify your address."
        })),
    ))
}

/// GET /api/auth/verify/{token}
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    auth.verify_email(&token).await?;
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let session = auth
        .login(&body.email, &body.password, body.remember_me)
        .await?;
    Ok(Json(SessionResponse {
        token: session.token,
        user: session.user,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SessionResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let session = auth.refresh(user_id).await?;
    Ok(Json(SessionResponse {
        token: session.token,
        user: session.user,
    }))
}
