//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] booknest_core::EmailError),

    /// Username missing or outside the allowed length.
    #[error("username must be 3-32 characters")]
    InvalidUsername,

    /// Password doesn't meet requirements.
    #[error("password must be at least 6 characters")]
    WeakPassword,

    /// Username is already registered.
    #[error("username already exists")]
    UsernameTaken,

    /// Email is already registered.
    #[error("email already exists")]
    EmailTaken,

    /// Wrong email or password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Account exists but the email was never verified.
    #[error("email not verified")]
    EmailNotVerified,

    /// Verification token is invalid, expired, or already consumed.
    #[error("invalid or expired verification token")]
    InvalidVerification,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Token issuance or validation failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
