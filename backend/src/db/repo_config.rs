//! Storage backend settings.
//!
//! These are the `[repository]` and `[postgres]` tables of `soccer.toml`;
//! [`crate::config::AppConfig`] embeds them and applies environment
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::factory::RepositoryType;
use super::repository::RepositoryError;
use crate::db::PostgresConfig;

/// Storage backend selection and connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_repo_type() -> String {
    "local".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl RepositoryConfig {
    /// Apply `REPOSITORY_TYPE`, `DATABASE_URL` / `PG_DATABASE_URL` and the
    /// `PG_*` pool variables on top of the file values. A database URL in
    /// the environment selects postgres unless `REPOSITORY_TYPE` says otherwise.
    pub fn apply_env(&mut self) {
        let url = std::env::var("DATABASE_URL").or_else(|_| std::env::var("PG_DATABASE_URL"));
        match std::env::var("REPOSITORY_TYPE") {
            Ok(repo_type) => self.repository.repo_type = repo_type,
            Err(_) if url.is_ok() => self.repository.repo_type = "postgres".to_string(),
            Err(_) => {}
        }
        if let Ok(url) = url {
            self.postgres.database_url = url;
        }

        let pg = &mut self.postgres;
        if let Some(v) = parse_env("PG_POOL_MAX") {
            pg.max_connections = v;
        }
        if let Some(v) = parse_env("PG_POOL_MIN") {
            pg.min_connections = v;
        }
        if let Some(v) = parse_env("PG_CONN_TIMEOUT_SEC") {
            pg.connect_timeout = v;
        }
        if let Some(v) = parse_env("PG_IDLE_TIMEOUT_SEC") {
            pg.idle_timeout = v;
        }
        if let Some(v) = parse_env("PG_MAX_RETRIES") {
            pg.max_retries = v;
        }
        if let Some(v) = parse_env("PG_RETRY_DELAY_MS") {
            pg.retry_delay_ms = v;
        }
    }

    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        RepositoryType::from_str(&self.repository.repo_type).map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })
    }

    /// Convert to a [`PostgresConfig`] if this is a Postgres configuration.
    #[cfg(feature = "postgres-repo")]
    pub fn to_postgres_config(&self) -> Result<Option<PostgresConfig>, RepositoryError> {
        if self.repository_type()? != RepositoryType::Postgres {
            return Ok(None);
        }

        if self.postgres.database_url.is_empty() {
            return Err(RepositoryError::configuration(
                "Postgres repository requires 'postgres.database_url' setting",
            ));
        }

        Ok(Some(PostgresConfig {
            database_url: self.postgres.database_url.clone(),
            max_pool_size: self.postgres.max_connections,
            min_pool_size: self.postgres.min_connections,
            connection_timeout_sec: self.postgres.connect_timeout,
            idle_timeout_sec: self.postgres.idle_timeout,
            max_retries: self.postgres.max_retries,
            retry_delay_ms: self.postgres.retry_delay_ms,
        }))
    }

    #[cfg(not(feature = "postgres-repo"))]
    pub fn to_postgres_config(&self) -> Result<Option<PostgresConfig>, RepositoryError> {
        if self.repository_type()? == RepositoryType::Postgres {
            return Err(RepositoryError::configuration(
                "Postgres repository feature not enabled",
            ));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables_default_to_local() {
        let config: RepositoryConfig = toml::from_str("").unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
        assert_eq!(config.postgres.max_connections, 10);
        assert!(config.to_postgres_config().unwrap().is_none());
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let config: RepositoryConfig = toml::from_str(
            r#"
[repository]
type = "mongo"
"#,
        )
        .unwrap();
        let err = config.repository_type().unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    }

    #[cfg(feature = "postgres-repo")]
    #[test]
    fn test_parse_postgres_config() {
        let toml = r#"
[repository]
type = "postgres"

[postgres]
database_url = "postgres://soccer:secret@db:5432/soccer"
max_connections = 20
min_connections = 2
connect_timeout = 15
idle_timeout = 300
max_retries = 5
retry_delay_ms = 250
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        let pg_config = config.to_postgres_config().unwrap().unwrap();
        assert_eq!(pg_config.database_url, "postgres://soccer:secret@db:5432/soccer");
        assert_eq!(pg_config.max_pool_size, 20);
        assert_eq!(pg_config.min_pool_size, 2);
        assert_eq!(pg_config.connection_timeout_sec, 15);
        assert_eq!(pg_config.idle_timeout_sec, 300);
        assert_eq!(pg_config.max_retries, 5);
        assert_eq!(pg_config.retry_delay_ms, 250);
    }

    #[cfg(feature = "postgres-repo")]
    #[test]
    fn test_postgres_requires_database_url() {
        let toml = r#"
[repository]
type = "postgres"
"#;

        let config: RepositoryConfig = toml::from_str(toml).unwrap();
        assert!(config.to_postgres_config().is_err());
    }

    #[cfg(not(feature = "postgres-repo"))]
    #[test]
    fn test_postgres_type_without_feature_fails() {
        let config: RepositoryConfig = toml::from_str("[repository]\ntype = \"pg\"\n").unwrap();
        assert!(config.to_postgres_config().is_err());
    }
}
