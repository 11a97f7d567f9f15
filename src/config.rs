use crate::core::db::{ConnectParams, DatabaseKind};
use crate::core::{DbdeskError, Result};
use crate::storage::HISTORY_LIMIT;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PREVIEW_LIMIT: usize = 100;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub connections: Vec<ConnectionProfile>,
}

/// UI-related configuration.
#[derive(Debug, Default, Deserialize)]
pub struct UiConfig {
    /// Row cap used when previewing a table
    pub preview_limit: Option<usize>,
}

/// Query history configuration.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryConfig {
    pub limit: Option<usize>,
    pub path: Option<PathBuf>,
}

/// A saved connection that can be opened by name.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub kind: DatabaseKind,
    /// File path for SQLite, database name for PostgreSQL
    pub target: String,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<i32>,
}

impl ConnectionProfile {
    pub fn params(&self) -> ConnectParams {
        ConnectParams {
            kind: self.kind,
            target: self.target.clone(),
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            port: self.port.unwrap_or(-1),
        }
    }
}

impl Config {
    pub fn preview_limit(&self) -> usize {
        self.ui.preview_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT)
    }

    pub fn history_limit(&self) -> usize {
        self.history.limit.unwrap_or(HISTORY_LIMIT)
    }

    /// Configured history file, or the per-user data directory default
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("dbdesk").join("history.db")))
    }

    pub fn profile(&self, name: &str) -> Option<&ConnectionProfile> {
        self.connections.iter().find(|p| p.name == name)
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbdesk").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbdesk::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Loads the file if it exists; a missing file yields the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| DbdeskError::Config(e.to_string()))?;
    if config.history_limit() == 0 {
        return Err(DbdeskError::Config("history.limit must be at least 1".to_string()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[ui]
preview_limit = 250

[history]
limit = 20
path = "/tmp/dbdesk-history.db"

[[connections]]
name = "local"
kind = "sqlite"
target = "/var/data/app.db"

[[connections]]
name = "warehouse"
kind = "postgresql"
target = "dw"
host = "db.internal"
user = "analyst"
port = 5433
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = parse_config(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.preview_limit(), 250);
        assert_eq!(config.history_limit(), 20);
        assert_eq!(
            config.history_path(),
            Some(PathBuf::from("/tmp/dbdesk-history.db"))
        );
        assert_eq!(config.connections.len(), 2);

        let warehouse = config.profile("warehouse").expect("profile missing");
        let params = warehouse.params();
        assert_eq!(params.kind, DatabaseKind::Postgres);
        assert_eq!(params.host.as_deref(), Some("db.internal"));
        assert_eq!(params.port, 5433);
    }

    #[test]
    fn test_defaults_for_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.preview_limit(), 100);
        assert_eq!(config.history_limit(), HISTORY_LIMIT);
        assert!(config.connections.is_empty());

        let local = ConnectionProfile {
            name: "x".to_string(),
            kind: DatabaseKind::Sqlite,
            target: "x.db".to_string(),
            host: None,
            user: None,
            password: None,
            port: None,
        };
        assert_eq!(local.params().port, -1);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        match parse_config("[history]\nlimit = 0\n") {
            Err(DbdeskError::Config(msg)) => assert!(msg.contains("history.limit")),
            other => panic!("Expected config error, got {:?}", other),
        }
        assert!(matches!(
            parse_config("[[connections]]\nname = 1"),
            Err(DbdeskError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert!(config.connections.is_empty());
    }
}
