//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::{AccessPolicy, OrderService, TokenVerifier, UserService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    verifier: TokenVerifier,
    policy: AccessPolicy,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Persistence backend
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        let verifier = TokenVerifier::new(&config.jwt);
        let policy = AccessPolicy::new(config.jwt.admin_group.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                verifier,
                policy,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }

    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.inner.policy
    }

    /// Order service bound to this state.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.policy(), self.config().pricing)
    }

    /// User service bound to this state.
    #[must_use]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(self.store(), self.policy())
    }
}
