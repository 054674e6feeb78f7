use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "TERAPIA_JWT_SECRET";
/// Environment variable that overrides `database.url`
pub const DATABASE_URL_ENV: &str = "TERAPIA_DATABASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full SQLite URL. When unset the database lives in `server.data_dir`.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seed the three demo therapists when the directory is empty
    #[serde(default)]
    pub seed_demo_data: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            seed_demo_data: false,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens. Required, there is no default.
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    /// Allow `POST /register` with `role = "admin"`
    #[serde(default)]
    pub allow_admin_registration: bool,
    /// Admin account ensured at startup when both fields are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            allow_admin_registration: false,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn default_token_ttl_secs() -> i64 {
    3600
}

/// Longest accepted token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests per window for authenticated API routes
    #[serde(default = "default_api_requests")]
    pub api_requests_per_window: u32,
    /// Requests per window for `/register` and `/login`
    #[serde(default = "default_auth_requests")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Seconds between sweeps of stale limiter entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_requests_per_window: default_api_requests(),
            auth_requests_per_window: default_auth_requests(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_requests() -> u32 {
    120
}

fn default_auth_requests() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file (defaults when it does not exist),
    /// then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        Ok(config.with_env_overrides())
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.database.url = Some(url);
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    /// Fail fast on settings the server cannot run without.
    pub fn validate(&self) -> Result<()> {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {}
            _ => bail!(
                "auth.jwt_secret is not configured (set it in the config file or via {})",
                JWT_SECRET_ENV
            ),
        }
        if self.auth.token_ttl_secs <= 0 || self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "auth.token_ttl_secs must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            );
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        Ok(())
    }

    /// SQLite URL to connect to
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite:{}?mode=rwc",
                self.server.data_dir.join("terapia.db").display()
            ),
        }
    }

    /// Admin bootstrap credentials, when both are configured
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.auth.admin_email, &self.auth.admin_password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email.as_str(), password.as_str()))
            }
            _ => None,
        }
    }
}
