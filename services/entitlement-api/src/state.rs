//! Application state

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::store::AccountStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Bearer token verification
    pub tokens: Arc<TokenVerifier>,
    /// Accounts and usage counters
    pub accounts: Arc<dyn AccountStore>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, accounts: Arc<dyn AccountStore>) -> Self {
        let tokens = TokenVerifier::new(config.jwt_secret.as_bytes(), config.token_ttl);
        Self {
            tokens: Arc::new(tokens),
            accounts,
            config: Arc::new(config),
        }
    }

    /// Uses granted to free accounts
    pub fn free_limit(&self) -> u32 {
        self.config.free_tool_limit
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
