//! Core Database Backend Traits
//!
//! The migration system never talks to a driver directly. Everything it needs
//! from a database goes through [`QueryExecutor`] and [`DatabaseTransaction`]:
//! raw statement execution, the table-scoped CRUD used by the ledger, table
//! introspection and transactions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::MigrationResult;
use crate::query::TableQuery;
use crate::schema::grammars::{Grammar, MySqlGrammar, PostgresGrammar, SqliteGrammar};

/// Abstract query executor bound to one database connection (or pool)
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// SQL dialect spoken by this executor
    fn dialect(&self) -> SqlDialect;

    /// Execute a statement and return the affected row count
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64>;

    /// Select rows described by a table-scoped query
    async fn select(&self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>>;

    /// Insert one row into `table`
    async fn insert(&self, table: &str, values: &[(&str, DatabaseValue)]) -> MigrationResult<u64>;

    /// Delete the rows matched by a table-scoped query
    async fn delete(&self, query: &TableQuery) -> MigrationResult<u64>;

    /// Names of all tables in the current schema
    async fn table_names(&self) -> MigrationResult<Vec<String>>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> MigrationResult<Box<dyn DatabaseTransaction>>;

    /// Check whether a table exists
    async fn has_table(&self, table: &str) -> MigrationResult<bool> {
        Ok(self.table_names().await?.iter().any(|name| name == table))
    }
}

/// Abstract database transaction.
///
/// Dropping a transaction without calling [`commit`](DatabaseTransaction::commit)
/// must roll it back.
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a statement within the transaction
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64>;

    /// Select rows within the transaction
    async fn select(&mut self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>>;

    /// Names of all tables visible to the transaction
    async fn table_names(&mut self) -> MigrationResult<Vec<String>>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> MigrationResult<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> MigrationResult<()>;
}

/// One result row keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseRow {
    values: HashMap<String, DatabaseValue>,
}

impl DatabaseRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Get a column value by name
    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.values.get(column)
    }

    /// Get a column as a string, if present and textual
    pub fn get_string(&self, column: &str) -> Option<String> {
        match self.values.get(column)? {
            DatabaseValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Get a column as an integer, widening 32 bit values
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.values.get(column)?.as_i64()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Convert row to JSON value
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(chrono::DateTime<chrono::Utc>),
    Json(JsonValue),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Integer view of the value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int32(i) => Some(*i as i64),
            DatabaseValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int32(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Int64(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(
                b.iter()
                    .map(|&x| JsonValue::Number(serde_json::Number::from(x)))
                    .collect(),
            ),
            DatabaseValue::Uuid(u) => JsonValue::String(u.to_string()),
            DatabaseValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            DatabaseValue::Json(j) => j.clone(),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl From<uuid::Uuid> for DatabaseValue {
    fn from(value: uuid::Uuid) -> Self {
        DatabaseValue::Uuid(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DatabaseValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::Json(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder style for this dialect
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Schema grammar compiling blueprints for this dialect
    pub fn grammar(&self) -> Arc<dyn Grammar> {
        match self {
            SqlDialect::PostgreSQL => Arc::new(PostgresGrammar::new()),
            SqlDialect::MySQL => Arc::new(MySqlGrammar::new()),
            SqlDialect::SQLite => Arc::new(SqliteGrammar::new()),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Ok(SqlDialect::PostgreSQL),
            "mysql" => Ok(SqlDialect::MySQL),
            "sqlite" => Ok(SqlDialect::SQLite),
            _ => Err(format!("Unsupported database dialect: {}", s)),
        }
    }
}
