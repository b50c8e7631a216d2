//! Application state for the HTTP server.

use std::sync::Arc;

use super::rate_limit::RateLimiter;
use crate::auth::{TokenError, TokenSigner};
use crate::config::AppConfig;
use crate::db::repository::FullRepository;
use crate::storage::FileStorage;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    pub config: Arc<AppConfig>,
    /// Image files on disk and their public URLs
    pub storage: FileStorage,
    pub signer: TokenSigner,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the state from a repository and the loaded configuration.
    pub fn new(repository: Arc<dyn FullRepository>, config: AppConfig) -> Result<Self, TokenError> {
        let storage = FileStorage::new(&config.storage.path, config.storage.static_url.clone());
        let signer = TokenSigner::new(&config.auth.secret_key, config.auth.token_ttl_secs)?;
        let limiter = RateLimiter::new(config.rate_limit.enabled, config.rate_limit.window_secs);

        Ok(Self {
            repository,
            config: Arc::new(config),
            storage,
            signer,
            limiter: Arc::new(limiter),
        })
    }

    pub fn max_per_page(&self) -> u32 {
        self.config.pagination.max_per_page
    }

    pub fn default_per_page(&self) -> u32 {
        self.config.pagination.default_per_page
    }
}
