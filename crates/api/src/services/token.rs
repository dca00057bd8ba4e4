//! Bearer token service.
//!
//! Issues and validates the two token kinds BookNest uses: access tokens
//! (the `Authorization: Bearer` credential) and email-verification tokens
//! (embedded in the verification link). Both are stateless HS256 JWTs;
//! there is no revocation list, a token simply fails verification after
//! its natural expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use booknest_core::{Email, UserId};

/// Default access token lifetime in seconds (24 hours).
const ACCESS_TTL_SECS: i64 = 24 * 60 * 60;
/// Access token lifetime in seconds with "remember me" (7 days).
const REMEMBER_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// Email verification token lifetime in seconds (7 days).
const VERIFICATION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Errors from token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature invalid, token expired, or wrong token kind.
    /// Callers must treat this as "unauthenticated", not retry.
    #[error("invalid or expired token")]
    Invalid,

    /// Token could not be signed (bad key material).
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Claims for an access token.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// Subject: the user ID.
    sub: i64,
    /// Expiration, seconds since epoch.
    exp: i64,
    /// Issued-at, seconds since epoch.
    iat: i64,
}

/// Claims for an email verification token.
///
/// A distinct shape from [`AccessClaims`] (keyed by `email`, no `sub`),
/// so one kind can never be presented as the other.
#[derive(Debug, Serialize, Deserialize)]
struct VerificationClaims {
    email: String,
    exp: i64,
    iat: i64,
}

/// Stateless bearer token service.
///
/// Constructed once with the signing secret and shared through
/// `AppState`; holds no mutable state.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    /// Create a token service from the configured signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue an access token for a user.
    ///
    /// Expires after 24 hours, or 7 days with `remember_me`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_access(&self, user_id: UserId, remember_me: bool) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = if remember_me {
            REMEMBER_TTL_SECS
        } else {
            ACCESS_TTL_SECS
        };
        let claims = AccessClaims {
            sub: user_id.as_i64(),
            exp: (now + Duration::seconds(ttl)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify an access token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] when the signature is bad or the
    /// token has expired.
    pub fn verify_access(&self, token: &str) -> Result<UserId, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| TokenError::Invalid)?;
        Ok(UserId::new(data.claims.sub))
    }

    /// Issue an email verification token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_verification(&self, email: &Email) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = VerificationClaims {
            email: email.as_str().to_owned(),
            exp: (now + Duration::seconds(VERIFICATION_TTL_SECS)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify an email verification token and return the address it was
    /// issued for.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] when the signature is bad, the
    /// token has expired, or an access token was presented instead.
    pub fn verify_verification(&self, token: &str) -> Result<Email, TokenError> {
        // Deserializing into VerificationClaims rejects access tokens:
        // they carry no `email` claim.
        let data = decode::<VerificationClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| TokenError::Invalid)?;
        Email::parse(&data.claims.email).map_err(|_| TokenError::Invalid)
    }
}
