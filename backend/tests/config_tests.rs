//! Configuration loading: TOML file, environment overrides, validation.

use std::io::Write;

use soccer_backend::config::{AppConfig, ConfigError, CONFIG_ENV};
use soccer_backend::db::RepositoryType;

mod support;

const CLEAR: &[(&str, Option<&str>)] = &[
    (CONFIG_ENV, None),
    ("HOST", None),
    ("PORT", None),
    ("MAX_CONTENT_LENGTH", None),
    ("DEBUG", None),
    ("STORAGE_PATH", None),
    ("STATIC_URL", None),
    ("SECRET_KEY", None),
    ("INTERNAL_TOKEN", None),
    ("TOKEN_TTL_SECS", None),
    ("MAX_PAGE_SIZE", None),
    ("RATE_LIMIT_ENABLED", None),
    ("RATE_LIMIT_WINDOW_SECS", None),
    ("REPOSITORY_TYPE", None),
    ("DATABASE_URL", None),
    ("PG_DATABASE_URL", None),
];

fn env_with(overrides: &[(&'static str, Option<&'static str>)]) -> Vec<(&'static str, Option<&'static str>)> {
    let mut changes: Vec<_> = CLEAR
        .iter()
        .filter(|(key, _)| !overrides.iter().any(|(k, _)| k == key))
        .copied()
        .collect();
    changes.extend_from_slice(overrides);
    changes
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_values_are_read() {
    let file = write_config(
        r#"
[server]
port = 8081

[storage]
static_url = "https://cdn.example.com/files"

[pagination]
max_per_page = 50

[repository]
type = "local"
"#,
    );

    let config = support::with_scoped_env(&env_with(&[]), || {
        AppConfig::load(Some(file.path())).unwrap()
    });
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.storage.static_url, "https://cdn.example.com/files");
    assert_eq!(config.pagination.max_per_page, 50);
    assert_eq!(config.pagination.default_per_page, 12);
    assert_eq!(
        config.database.repository_type().unwrap(),
        RepositoryType::Local
    );
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config("[server]\nport = 8081\n");

    let config = support::with_scoped_env(
        &env_with(&[
            ("PORT", Some("9090")),
            ("SECRET_KEY", Some("from-env")),
            ("RATE_LIMIT_ENABLED", Some("false")),
            ("MAX_PAGE_SIZE", Some("25")),
        ]),
        || AppConfig::load(Some(file.path())).unwrap(),
    );
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.auth.secret_key, "from-env");
    assert!(!config.rate_limit.enabled);
    assert_eq!(config.pagination.max_per_page, 25);
    assert_eq!(config.bind_address(), "0.0.0.0:9090");
}

#[test]
fn test_config_path_from_environment() {
    let file = write_config("[server]\nhost = \"127.0.0.1\"\n");
    let path = file.path().to_str().unwrap().to_string();
    let path: &'static str = Box::leak(path.into_boxed_str());

    let config = support::with_scoped_env(&env_with(&[(CONFIG_ENV, Some(path))]), || {
        AppConfig::load(None).unwrap()
    });
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn test_database_url_selects_postgres() {
    let config = support::with_scoped_env(
        &env_with(&[("DATABASE_URL", Some("postgres://u:p@localhost/soccer"))]),
        || {
            let mut config = AppConfig::default();
            config.apply_env().unwrap();
            config
        },
    );
    assert_eq!(
        config.database.repository_type().unwrap(),
        RepositoryType::Postgres
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let result = support::with_scoped_env(&env_with(&[("PORT", Some("eighty"))]), || {
        AppConfig::load(Some(write_config("").path()))
    });
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let result = support::with_scoped_env(&env_with(&[("REPOSITORY_TYPE", Some("mongo"))]), || {
        AppConfig::load(Some(write_config("").path()))
    });
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let file = write_config("[pagination]\ndefault_per_page = 500\n");
    let result = support::with_scoped_env(&env_with(&[]), || AppConfig::load(Some(file.path())));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_unreadable_and_malformed_files() {
    let result = support::with_scoped_env(&env_with(&[]), || {
        AppConfig::load(Some(std::path::Path::new("/nonexistent/soccer.toml")))
    });
    assert!(matches!(result, Err(ConfigError::Read { .. })));

    let file = write_config("[server\nport = 1");
    let result = support::with_scoped_env(&env_with(&[]), || AppConfig::load(Some(file.path())));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}
