//! Authentication service.
//!
//! Handles signup with email verification, login, and token refresh.
//! Passwords are hashed with Argon2id; sessions are stateless JWTs
//! issued by [`TokenService`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use booknest_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;
use crate::services::token::TokenService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Allowed username length range.
const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=32;

/// A freshly registered account plus the verification token to deliver
/// out of band.
pub struct Signup {
    pub user: User,
    pub verification_token: String,
}

/// An authenticated session: the account and its access token.
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new account.
    ///
    /// The account starts unverified; the returned token must reach the
    /// user (normally by email) and be presented to [`Self::verify_email`]
    /// before login is allowed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidUsername`,
    /// or `AuthError::WeakPassword` on validation failure, and
    /// `AuthError::UsernameTaken` / `AuthError::EmailTaken` when the
    /// identifier is already registered.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Signup, AuthError> {
        let email = Email::parse(email)?;

        let username = username.trim();
        if !USERNAME_LENGTH.contains(&username.len()) {
            return Err(AuthError::InvalidUsername);
        }
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        let verification_token = self.tokens.issue_verification(&email)?;

        let user = self
            .users
            .create(NewUser {
                username,
                email: &email,
                password_hash: &password_hash,
                full_name: full_name.trim(),
                verification_token: &verification_token,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) if msg.contains("username") => {
                    AuthError::UsernameTaken
                }
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        Ok(Signup {
            user,
            verification_token,
        })
    }

    /// Verify an account's email address, consuming the token.
    ///
    /// The email is carried inside the signed token, so the caller only
    /// presents the token itself.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidVerification` when the token is
    /// invalid, expired, or already consumed.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let email = self
            .tokens
            .verify_verification(token)
            .map_err(|_| AuthError::InvalidVerification)?;

        self.users
            .verify_email(&email, token)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidVerification,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// `remember_me` extends the access token lifetime from one day to
    /// seven.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is
    /// wrong, and `AuthError::EmailNotVerified` for correct credentials
    /// on an unverified account.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let user = authenticate(user, &password_hash, password)?;

        let token = self.tokens.issue_access(user.id, remember_me)?;
        Ok(Session { user, token })
    }

    /// Issue a fresh access token for an already-authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn refresh(&self, user_id: UserId) -> Result<Session, AuthError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.tokens.issue_access(user.id, false)?;
        Ok(Session { user, token })
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// The login decision for a stored account: the password must match and
/// the email must be verified before any token is issued.
fn authenticate(user: User, stored_hash: &str, password: &str) -> Result<User, AuthError> {
    verify_password(password, stored_hash)?;
    if !user.verified {
        return Err(AuthError::EmailNotVerified);
    }
    Ok(user)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();
    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(verified: bool) -> User {
        User {
            id: UserId::new(7),
            username: "reader".to_owned(),
            email: Email::parse("reader@example.com").unwrap(),
            full_name: "Avid Reader".to_owned(),
            address: None,
            phone_number: None,
            birthday: None,
            verified,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(matches!(
            validate_password("hunt2"),
            Err(AuthError::WeakPassword)
        ));
        assert!(validate_password("hunter2").is_ok());
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        verify_password("correct horse battery", &hash).unwrap();
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(matches!(
            verify_password("incorrect horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn unverified_account_cannot_login_even_with_the_right_password() {
        let hash = hash_password("hunter22").unwrap();
        assert!(matches!(
            authenticate(account(false), &hash, "hunter22"),
            Err(AuthError::EmailNotVerified)
        ));
    }

    #[test]
    fn verified_account_with_the_right_password_logs_in() {
        let hash = hash_password("hunter22").unwrap();
        let user = authenticate(account(true), &hash, "hunter22").unwrap();
        assert_eq!(user.id, UserId::new(7));
    }

    #[test]
    fn wrong_password_wins_over_the_verification_check() {
        let hash = hash_password("hunter22").unwrap();
        assert!(matches!(
            authenticate(account(false), &hash, "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
