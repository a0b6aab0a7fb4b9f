//! Error types for the migration system
//!
//! Configuration problems (unknown column types, unknown connections, invalid
//! models) and storage failures surfaced by the query executor share one enum
//! so that `run` and `rollback` can propagate either with `?`.

use strata_codegen::CodegenError;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The query executor reported a failure (syntax error, constraint
    /// violation, lost connection...)
    #[error("Database error: {0}")]
    Database(String),

    /// A connection could not be established or acquired
    #[error("Connection error: {0}")]
    Connection(String),

    /// Beginning, committing or rolling back a transaction failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A migration asked for a connection that was never registered
    #[error("Connection '{0}' is not registered")]
    UnknownConnection(String),

    /// The grammar has no type compiler for the column's type tag
    #[error("Column '{column}' uses type '{column_type}' which the {dialect} grammar does not support")]
    UnsupportedColumnType {
        column: String,
        column_type: String,
        dialect: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Migration body reported a failure of its own
    #[error("Migration '{signature}' failed: {message}")]
    Failed { signature: String, message: String },

    /// Model mapping or stub rendering failed
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Build a failure raised from inside a migration's `up` or `down`
    pub fn failed(signature: impl Into<String>, message: impl Into<String>) -> Self {
        MigrationError::Failed {
            signature: signature.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by configuration rather than storage
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MigrationError::UnknownConnection(_)
                | MigrationError::UnsupportedColumnType { .. }
                | MigrationError::Configuration(_)
                | MigrationError::Codegen(_)
        )
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                MigrationError::Connection(err.to_string())
            }
            other => MigrationError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        let err = MigrationError::UnsupportedColumnType {
            column: "payload".to_string(),
            column_type: "jsonb".to_string(),
            dialect: "sqlite".to_string(),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("jsonb"));

        assert!(!MigrationError::Database("boom".to_string()).is_configuration());
    }

    #[test]
    fn test_sqlx_pool_errors_map_to_connection() {
        let err: MigrationError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, MigrationError::Connection(_)));

        let err: MigrationError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MigrationError::Database(_)));
    }
}
