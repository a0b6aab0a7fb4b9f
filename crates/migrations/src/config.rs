//! Migration configuration
//!
//! Defaults can be overridden from environment variables (`from_env`) or from
//! any deserializable source, e.g. the `[migrations]` table of `strata.toml`.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, MigrationResult};

/// Configuration for the migration system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Database URL of the default connection
    pub database_url: Option<String>,
    /// Name of the default connection
    pub default_connection: String,
    /// Table prefix of the default connection
    pub prefix: String,
    /// Ledger table name
    pub migrations_table: String,
    /// Directory new migration files are written to
    pub migrations_dir: PathBuf,
    /// Directory model sources are looked up in by `make:migration --model`
    pub models_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_connection: "default".to_string(),
            prefix: String::new(),
            migrations_table: "migrations".to_string(),
            migrations_dir: PathBuf::from("database/migrations"),
            models_dir: PathBuf::from("src/models"),
        }
    }
}

impl MigrationConfig {
    /// Load from `DATABASE_URL`, `DB_CONNECTION`, `DB_PREFIX`,
    /// `MIGRATIONS_TABLE`, `MIGRATIONS_DIR` and `MODELS_DIR`
    pub fn from_env() -> MigrationResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> MigrationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().merge_lookup(lookup)
    }

    /// Override the values present in `lookup`, keeping the rest
    pub fn merge_lookup<F>(self, lookup: F) -> MigrationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self;

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Some(connection) = lookup("DB_CONNECTION") {
            config.default_connection = connection;
        }
        if let Some(prefix) = lookup("DB_PREFIX") {
            config.prefix = prefix;
        }
        if let Some(table) = lookup("MIGRATIONS_TABLE") {
            config.migrations_table = table;
        }
        if let Some(dir) = lookup("MIGRATIONS_DIR") {
            config.migrations_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODELS_DIR") {
            config.models_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that names used in SQL are plain identifiers
    pub fn validate(&self) -> MigrationResult<()> {
        if !is_identifier(&self.migrations_table) {
            return Err(MigrationError::Configuration(format!(
                "Invalid migrations table name: '{}'",
                self.migrations_table
            )));
        }
        if !self.prefix.is_empty() && !is_identifier(&self.prefix) {
            return Err(MigrationError::Configuration(format!(
                "Invalid table prefix: '{}'",
                self.prefix
            )));
        }
        if self.default_connection.trim().is_empty() {
            return Err(MigrationError::Configuration(
                "Default connection name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Require a database URL
    pub fn require_database_url(&self) -> MigrationResult<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            MigrationError::Configuration("DATABASE_URL is not set".to_string())
        })
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.migrations_table, "migrations");
        assert_eq!(config.migrations_dir, PathBuf::from("database/migrations"));
        assert_eq!(config.default_connection, "default");
        assert!(config.prefix.is_empty());
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DB_PREFIX", "app_"),
            ("MIGRATIONS_TABLE", "schema_migrations"),
            ("MIGRATIONS_DIR", "db/migrate"),
        ]
        .into_iter()
        .collect();

        let config = MigrationConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/app");
        assert_eq!(config.prefix, "app_");
        assert_eq!(config.migrations_table, "schema_migrations");
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrate"));
        assert_eq!(config.models_dir, PathBuf::from("src/models"));
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let base = MigrationConfig {
            migrations_table: "ledger".to_string(),
            prefix: "app_".to_string(),
            ..Default::default()
        };
        let merged = base
            .merge_lookup(|key| (key == "DB_PREFIX").then(|| "tenant_".to_string()))
            .unwrap();
        assert_eq!(merged.migrations_table, "ledger");
        assert_eq!(merged.prefix, "tenant_");
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let err = MigrationConfig::from_lookup(|key| {
            (key == "MIGRATIONS_TABLE").then(|| "migrations; drop table users".to_string())
        })
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MigrationConfig =
            serde_json::from_str(r#"{"migrations_table": "ledger", "prefix": "t_"}"#).unwrap();
        assert_eq!(config.migrations_table, "ledger");
        assert_eq!(config.prefix, "t_");
        assert_eq!(config.default_connection, "default");
    }
}
