pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;

pub use db::DbPool;

use anyhow::{Context, Result};
use config::Config;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::auth::TokenService;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the shared state. Fails when the signing secret is missing.
    pub fn new(config: Config, db: DbPool) -> Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .context("auth.jwt_secret is not configured")?;
        let tokens = TokenService::new(secret, config.auth.token_ttl_secs)
            .context("Failed to initialize token service")?;
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            db,
            tokens,
            rate_limiter,
        })
    }
}
