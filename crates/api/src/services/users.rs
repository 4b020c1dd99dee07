//! User and address lookups.

use tracing::instrument;

use storekeep_core::{AddressId, UserId};

use super::policy::AccessPolicy;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Address, Claims, User};

/// Read access to users and their saved addresses.
pub struct UserService<'a> {
    store: &'a dyn Store,
    policy: &'a AccessPolicy,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: &'a AccessPolicy) -> Self {
        Self { store, policy }
    }

    /// List all users, optionally filtered by exact email. Admin only.
    ///
    /// # Errors
    ///
    /// Unauthorized unless the caller is an admin.
    #[instrument(skip(self, claims))]
    pub async fn list(&self, claims: Option<&Claims>, email: Option<&str>) -> Result<Vec<User>> {
        self.policy.require_admin(claims)?;

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        Ok(self.store.list_users(email).await?)
    }

    /// Fetch a single user.
    ///
    /// # Errors
    ///
    /// Unauthorized unless the caller is the user or an admin; not found for
    /// unknown users.
    #[instrument(skip(self, claims), fields(user_id = %user_id))]
    pub async fn get(&self, claims: Option<&Claims>, user_id: &UserId) -> Result<User> {
        self.policy.authorize(claims, Some(user_id))?;
        self.load(user_id).await
    }

    /// List the addresses saved for a user.
    ///
    /// # Errors
    ///
    /// Same as [`UserService::get`].
    #[instrument(skip(self, claims), fields(user_id = %user_id))]
    pub async fn addresses(&self, claims: Option<&Claims>, user_id: &UserId) -> Result<Vec<Address>> {
        self.policy.authorize(claims, Some(user_id))?;
        self.load(user_id).await?;
        Ok(self.store.list_addresses(user_id).await?)
    }

    /// Fetch one of a user's addresses.
    ///
    /// # Errors
    ///
    /// Same as [`UserService::get`], plus not found when the address does
    /// not exist or belongs to somebody else.
    #[instrument(skip(self, claims), fields(user_id = %user_id, address_id = %id))]
    pub async fn address(
        &self,
        claims: Option<&Claims>,
        user_id: &UserId,
        id: &AddressId,
    ) -> Result<Address> {
        self.policy.authorize(claims, Some(user_id))?;
        self.load(user_id).await?;

        self.store
            .find_address(id)
            .await?
            .filter(|address| address.belongs_to(Some(user_id)))
            .ok_or_else(|| AppError::NotFound(format!("Address {id} not found")))
    }

    async fn load(&self, user_id: &UserId) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use storekeep_core::Email;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::AddressFields;

    fn claims(sub: &str, groups: &[&str]) -> Claims {
        Claims {
            sub: sub.into(),
            email: None,
            groups: groups.iter().map(|g| (*g).to_string()).collect(),
            exp: 0,
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, email) in [("bruce", "bruce@wayne.com"), ("selina", "selina@kyle.com")] {
            store
                .insert_user(User {
                    id: UserId::new(id),
                    email: Email::parse(email).unwrap(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await;
        }
        store
            .insert_address(Address {
                id: AddressId::new("catsuit-closet"),
                user_id: Some(UserId::new("selina")),
                fields: AddressFields {
                    last_name: "Kyle".into(),
                    address1: "East End".into(),
                    city: "Gotham".into(),
                    country: "US".into(),
                    zip: "10002".into(),
                    ..Default::default()
                },
                created_at: Utc::now(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_list_is_admin_only() {
        let store = store().await;
        let policy = AccessPolicy::new("admin");
        let service = UserService::new(&store, &policy);

        let err = service
            .list(Some(&claims("bruce", &[])), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let all = service
            .list(Some(&claims("alfred", &["admin"])), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filtered = service
            .list(Some(&claims("alfred", &["admin"])), Some("selina@kyle.com"))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, UserId::new("selina"));
    }

    #[tokio::test]
    async fn test_get_checks_rights_before_existence() {
        let store = store().await;
        let policy = AccessPolicy::new("admin");
        let service = UserService::new(&store, &policy);

        let err = service
            .get(Some(&claims("bruce", &[])), &UserId::new("nobody"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = service
            .get(Some(&claims("alfred", &["admin"])), &UserId::new("nobody"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_address_must_belong_to_user() {
        let store = store().await;
        let policy = AccessPolicy::new("admin");
        let service = UserService::new(&store, &policy);
        let admin = claims("alfred", &["admin"]);

        let address = service
            .address(
                Some(&admin),
                &UserId::new("selina"),
                &AddressId::new("catsuit-closet"),
            )
            .await
            .unwrap();
        assert_eq!(address.fields.last_name, "Kyle");

        let err = service
            .address(
                Some(&admin),
                &UserId::new("bruce"),
                &AddressId::new("catsuit-closet"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
