//! Application configuration.
//!
//! Values come from a `soccer.toml` file (every table optional) and are then
//! overridden by environment variables:
//!
//! | key                          | env                      | default                      |
//! |------------------------------|--------------------------|------------------------------|
//! | `server.host`                | `HOST`                   | `0.0.0.0`                    |
//! | `server.port`                | `PORT`                   | `5000`                       |
//! | `server.max_content_length`  | `MAX_CONTENT_LENGTH`     | 100 MiB                      |
//! | `server.debug`               | `DEBUG`                  | `false`                      |
//! | `storage.path`               | `STORAGE_PATH`           | `/var/www/html/file`         |
//! | `storage.static_url`         | `STATIC_URL`             | `http://localhost:5000/files`|
//! | `auth.secret_key`            | `SECRET_KEY`             | development value            |
//! | `auth.internal_token`        | `INTERNAL_TOKEN`         | development value            |
//! | `auth.token_ttl_secs`        | `TOKEN_TTL_SECS`         | 30 days                      |
//! | `pagination.max_per_page`    | `MAX_PAGE_SIZE`          | `100`                        |
//! | `rate_limit.enabled`         | `RATE_LIMIT_ENABLED`     | `true`                       |
//! | `rate_limit.window_secs`     | `RATE_LIMIT_WINDOW_SECS` | `300`                        |
//!
//! `[repository]` and `[postgres]` are described in [`crate::db::repo_config`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::db::RepositoryConfig;
use crate::models::pagination::DEFAULT_PER_PAGE;

pub const CONFIG_ENV: &str = "SOCCER_CONFIG";
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-me";
pub const DEV_INTERNAL_TOKEN: &str = "dev-internal-token-change-me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_content_length: usize,
    pub debug: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_content_length: 100 * 1024 * 1024,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
    pub static_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/www/html/file"),
            static_url: "http://localhost:5000/files".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub secret_key: String,
    pub internal_token: String,
    pub token_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            internal_token: DEV_INTERNAL_TOKEN.to_string(),
            token_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

impl AuthSettings {
    /// True while either secret still has its development value.
    pub fn uses_dev_secrets(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY || self.internal_token == DEV_INTERNAL_TOKEN
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(flatten)]
    pub database: RepositoryConfig,
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid(format!(
                "{} must be a boolean, got '{}'",
                key, raw
            ))),
        },
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Parse a TOML document without applying the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the configuration the server runs with.
    ///
    /// The file is `explicit` if given, else `$SOCCER_CONFIG`, else the first
    /// of `soccer.toml`, `backend/soccer.toml`, `/etc/soccer/soccer.toml`
    /// that exists. Without any file the defaults apply. Environment
    /// overrides and validation run last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => match std::env::var(CONFIG_ENV) {
                Ok(path) => Some(PathBuf::from(path)),
                Err(_) => Self::default_locations().into_iter().find(|p| p.exists()),
            },
        };

        let mut config = match path {
            Some(path) => {
                log::info!("loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_locations() -> Vec<PathBuf> {
        vec![
            PathBuf::from("soccer.toml"),
            PathBuf::from("backend/soccer.toml"),
            PathBuf::from("/etc/soccer/soccer.toml"),
        ]
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("PORT")? {
            self.server.port = port;
        }
        if let Some(len) = env_value("MAX_CONTENT_LENGTH")? {
            self.server.max_content_length = len;
        }
        if let Some(debug) = env_flag("DEBUG")? {
            self.server.debug = debug;
        }

        if let Ok(path) = std::env::var("STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("STATIC_URL") {
            self.storage.static_url = url;
        }

        if let Ok(secret) = std::env::var("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Ok(token) = std::env::var("INTERNAL_TOKEN") {
            self.auth.internal_token = token;
        }
        if let Some(ttl) = env_value("TOKEN_TTL_SECS")? {
            self.auth.token_ttl_secs = ttl;
        }

        if let Some(max) = env_value("MAX_PAGE_SIZE")? {
            self.pagination.max_per_page = max;
        }

        if let Some(enabled) = env_flag("RATE_LIMIT_ENABLED")? {
            self.rate_limit.enabled = enabled;
        }
        if let Some(window) = env_value("RATE_LIMIT_WINDOW_SECS")? {
            self.rate_limit.window_secs = window;
        }

        self.database.apply_env();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pagination = &self.pagination;
        if pagination.max_per_page == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_per_page must be at least 1".to_string(),
            ));
        }
        if pagination.default_per_page == 0 || pagination.default_per_page > pagination.max_per_page
        {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_per_page must be between 1 and {}",
                pagination.max_per_page
            )));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_secs must be at least 1".to_string(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.auth.secret_key.is_empty() || self.auth.internal_token.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.secret_key and auth.internal_token must not be empty".to_string(),
            ));
        }
        self.database
            .repository_type()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
