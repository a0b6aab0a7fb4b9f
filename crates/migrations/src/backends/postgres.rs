//! PostgreSQL Executor
//!
//! [`QueryExecutor`] over a sqlx `PgPool`. Each migration runs in a
//! `sqlx::Transaction`, which rolls back when dropped uncommitted.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo, ValueRef};
use tracing::debug;

use super::core::*;
use crate::error::{MigrationError, MigrationResult};
use crate::query::{insert_sql, TableQuery};

const TABLE_NAMES_SQL: &str =
    "select tablename from pg_catalog.pg_tables where schemaname = current_schema() order by tablename";

/// PostgreSQL query executor
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `database_url`
    pub async fn connect(database_url: &str) -> MigrationResult<Self> {
        validate_database_url(database_url)?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| MigrationError::Connection(format!("Failed to connect to database: {}", e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSQL
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64> {
        debug!("{}", sql);
        let result = bind_all(sqlx::query(sql), params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn select(&self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>> {
        let (sql, params) = query.to_select_sql(SqlDialect::PostgreSQL);
        let rows = bind_all(sqlx::query(&sql), &params).fetch_all(&self.pool).await?;
        rows.iter().map(to_database_row).collect()
    }

    async fn insert(&self, table: &str, values: &[(&str, DatabaseValue)]) -> MigrationResult<u64> {
        let (sql, params) = insert_sql(SqlDialect::PostgreSQL, table, values);
        self.execute(&sql, &params).await
    }

    async fn delete(&self, query: &TableQuery) -> MigrationResult<u64> {
        let (sql, params) = query.to_delete_sql(SqlDialect::PostgreSQL);
        self.execute(&sql, &params).await
    }

    async fn table_names(&self) -> MigrationResult<Vec<String>> {
        let rows = sqlx::query(TABLE_NAMES_SQL).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(MigrationError::from))
            .collect()
    }

    async fn begin_transaction(&self) -> MigrationResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Transaction(format!("Failed to start transaction: {}", e)))?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }
}

/// PostgreSQL transaction
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn tx(&mut self) -> MigrationResult<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| MigrationError::Transaction("Transaction already completed".to_string()))
    }
}

#[async_trait]
impl DatabaseTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrationResult<u64> {
        debug!("{}", sql);
        let tx = self.tx()?;
        let result = bind_all(sqlx::query(sql), params).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn select(&mut self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>> {
        let (sql, params) = query.to_select_sql(SqlDialect::PostgreSQL);
        let tx = self.tx()?;
        let rows = bind_all(sqlx::query(&sql), &params).fetch_all(&mut **tx).await?;
        rows.iter().map(to_database_row).collect()
    }

    async fn table_names(&mut self) -> MigrationResult<Vec<String>> {
        let tx = self.tx()?;
        let rows = sqlx::query(TABLE_NAMES_SQL).fetch_all(&mut **tx).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(MigrationError::from))
            .collect()
    }

    async fn commit(mut self: Box<Self>) -> MigrationResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| MigrationError::Transaction("Transaction already completed".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| MigrationError::Transaction(format!("Transaction commit failed: {}", e)))
    }

    async fn rollback(mut self: Box<Self>) -> MigrationResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| MigrationError::Transaction("Transaction already completed".to_string()))?;
        tx.rollback()
            .await
            .map_err(|e| MigrationError::Transaction(format!("Transaction rollback failed: {}", e)))
    }
}

/// Accept only `postgres://` and `postgresql://` URLs
pub fn validate_database_url(database_url: &str) -> MigrationResult<()> {
    let parsed = url::Url::parse(database_url)
        .map_err(|e| MigrationError::Configuration(format!("Invalid database URL: {}", e)))?;

    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(()),
        other => Err(MigrationError::Configuration(format!(
            "Invalid PostgreSQL URL scheme: {}",
            other
        ))),
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[DatabaseValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DatabaseValue::Null => query.bind(Option::<String>::None),
            DatabaseValue::Bool(b) => query.bind(*b),
            DatabaseValue::Int32(i) => query.bind(*i),
            DatabaseValue::Int64(i) => query.bind(*i),
            DatabaseValue::Float64(f) => query.bind(*f),
            DatabaseValue::String(s) => query.bind(s.clone()),
            DatabaseValue::Bytes(b) => query.bind(b.clone()),
            DatabaseValue::Uuid(u) => query.bind(*u),
            DatabaseValue::DateTime(dt) => query.bind(*dt),
            DatabaseValue::Json(j) => query.bind(j.clone()),
        };
    }
    query
}

fn to_database_row(row: &PgRow) -> MigrationResult<DatabaseRow> {
    let mut result = DatabaseRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        result.insert(column.name(), column_value(row, index)?);
    }
    Ok(result)
}

fn column_value(row: &PgRow, index: usize) -> MigrationResult<DatabaseValue> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let value = match row.columns()[index].type_info().name() {
        "BOOL" => DatabaseValue::Bool(row.try_get(index)?),
        "INT2" => DatabaseValue::Int32(row.try_get::<i16, _>(index)? as i32),
        "INT4" => DatabaseValue::Int32(row.try_get(index)?),
        "INT8" => DatabaseValue::Int64(row.try_get(index)?),
        "FLOAT8" => DatabaseValue::Float64(row.try_get(index)?),
        "BYTEA" => DatabaseValue::Bytes(row.try_get(index)?),
        "UUID" => DatabaseValue::Uuid(row.try_get(index)?),
        "TIMESTAMPTZ" => DatabaseValue::DateTime(row.try_get(index)?),
        "JSON" | "JSONB" => DatabaseValue::Json(row.try_get::<JsonValue, _>(index)?),
        _ => DatabaseValue::String(row.try_get(index)?),
    };
    Ok(value)
}
