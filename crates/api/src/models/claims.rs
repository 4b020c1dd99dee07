//! Verified bearer token claims.

use serde::{Deserialize, Serialize};

use storekeep_core::UserId;

/// Identity facts carried by a verified token.
///
/// Never persisted; extracted per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject ID issued by the identity provider.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Expiry (Unix seconds).
    pub exp: u64,
}

impl Claims {
    /// The subject as a user ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }

    /// Whether the subject is `user_id`.
    #[must_use]
    pub fn is_subject(&self, user_id: &UserId) -> bool {
        self.sub == user_id.as_str()
    }

    /// The claimed email, if present and non-blank.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Whether the token lists `group` among its memberships.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
