//! Ownership and admin checks.

use storekeep_core::UserId;

use crate::models::Claims;

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The caller is the resource owner.
    Owner,
    /// The caller belongs to the admin group.
    Admin,
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("no credentials")]
    Unauthenticated,
    #[error("neither owner nor admin")]
    Forbidden,
}

/// Decides whether a caller may act on a resource.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    admin_group: String,
}

impl AccessPolicy {
    /// Create a policy granting admin rights to members of `admin_group`.
    ///
    /// An empty group name makes nobody an admin.
    #[must_use]
    pub fn new(admin_group: impl Into<String>) -> Self {
        Self {
            admin_group: admin_group.into(),
        }
    }

    /// Whether `claims` carry admin rights.
    #[must_use]
    pub fn is_admin(&self, claims: &Claims) -> bool {
        !self.admin_group.is_empty() && claims.in_group(&self.admin_group)
    }

    /// Check access to a resource owned by `owner` (`None` for guest resources).
    ///
    /// # Errors
    ///
    /// Returns [`Denial::Unauthenticated`] without claims, and
    /// [`Denial::Forbidden`] when the caller is neither owner nor admin.
    pub fn authorize(
        &self,
        claims: Option<&Claims>,
        owner: Option<&UserId>,
    ) -> Result<Access, Denial> {
        let claims = claims.ok_or(Denial::Unauthenticated)?;

        if owner.is_some_and(|owner| claims.is_subject(owner)) {
            return Ok(Access::Owner);
        }
        if self.is_admin(claims) {
            return Ok(Access::Admin);
        }
        Err(Denial::Forbidden)
    }

    /// Require admin rights regardless of ownership.
    ///
    /// # Errors
    ///
    /// Returns a [`Denial`] unless the caller is an admin.
    pub fn require_admin(&self, claims: Option<&Claims>) -> Result<Access, Denial> {
        self.authorize(claims, None)
    }
}
