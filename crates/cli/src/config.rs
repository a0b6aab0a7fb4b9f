//! `strata.toml` loading
//!
//! ```toml
//! [migrations]
//! database_url = "postgres://localhost/app"
//! migrations_table = "migrations"
//! migrations_dir = "database/migrations"
//!
//! [connections.analytics]
//! url = "postgres://localhost/analytics"
//! prefix = "stats_"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Environment variables (`DATABASE_URL`, `DB_PREFIX`, ...) override the
//! `[migrations]` table.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use strata_migrations::MigrationConfig;

use crate::error::{CliError, CliResult};
use crate::logging::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

/// A named connection besides the default one
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub migrations: MigrationConfig,
    pub connections: BTreeMap<String, ConnectionConfig>,
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Load `path`, or `strata.toml` in the working directory when present,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> CliResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match path {
            Some(path) if !path.is_file() => {
                return Err(CliError::ConfigNotFound(path.to_path_buf()))
            }
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        Ok(Self {
            migrations: config.migrations.merge_lookup(lookup)?,
            ..config
        })
    }

    pub fn from_file(path: &Path) -> CliResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml(&source).map_err(|message| CliError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(source: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(source).map_err(|e| e.to_string())?;
        if config.connections.contains_key(&config.migrations.default_connection) {
            return Err(format!(
                "connection '{}' is the default connection and is configured by [migrations]",
                config.migrations.default_connection
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
[migrations]
database_url = "postgres://localhost/app"
migrations_table = "schema_migrations"
prefix = "app_"

[connections.analytics]
url = "postgres://localhost/analytics"
prefix = "stats_"

[logging]
level = "debug"
"#;

    #[test]
    fn test_parse_sample() {
        let config = StrataConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.migrations.migrations_table, "schema_migrations");
        assert_eq!(config.migrations.prefix, "app_");
        assert_eq!(config.migrations.migrations_dir, PathBuf::from("database/migrations"));
        assert_eq!(config.connections["analytics"].prefix, "stats_");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = StrataConfig::from_toml("").unwrap();
        assert_eq!(config, StrataConfig::default());
    }

    #[test]
    fn test_default_connection_cannot_be_redefined() {
        let source = "[connections.default]\nurl = \"postgres://localhost/other\"\n";
        assert!(StrataConfig::from_toml(source).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = StrataConfig::load_with(Some(&path), |key| match key {
            "DATABASE_URL" => Some("postgres://db/override".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.migrations.database_url.as_deref(), Some("postgres://db/override"));
        assert_eq!(config.migrations.prefix, "app_");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = StrataConfig::load_with(Some(Path::new("/nonexistent/strata.toml")), |_| None)
            .unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound(_)));
    }

    #[test]
    fn test_invalid_table_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, "[migrations]\nmigrations_table = \"bad name\"\n").unwrap();

        let err = StrataConfig::load_with(Some(&path), |_| None).unwrap_err();
        assert!(matches!(err, CliError::Migration(_)));
    }
}
