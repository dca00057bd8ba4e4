//! User domain type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use booknest_core::{Email, UserId};

/// A BookNest user account.
///
/// The password hash and verification token are deliberately absent: they
/// live in the repository layer and are never serialized to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique display name chosen at signup.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// Full name.
    pub full_name: String,
    /// Shipping address, if the user has set one.
    pub address: Option<String>,
    /// Phone number, if set.
    pub phone_number: Option<String>,
    /// Birthday, if set.
    pub birthday: Option<NaiveDate>,
    /// Whether the email address has been verified.
    pub verified: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a user may change about themselves.
///
/// `None` means "leave unchanged"; identity fields (username, email) are
/// not updatable through this path.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,
}

impl ProfileUpdate {
    /// True when no field is set, i.e. the update would be a no-op.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.address.is_none()
            && self.phone_number.is_none()
            && self.birthday.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User {
            id: UserId::new(1),
            username: "reader".to_owned(),
            email: Email::parse("reader@example.com").unwrap(),
            full_name: "Avid Reader".to_owned(),
            address: None,
            phone_number: None,
            birthday: None,
            verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["fullName"], "Avid Reader");
        assert_eq!(json["verified"], true);
        // No credential material leaks through serialization
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("verificationToken").is_none());
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            address: Some("12 Shelf Lane".to_owned()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
