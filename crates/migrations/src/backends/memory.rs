//! In-memory executor
//!
//! Keeps table names and ledger rows in memory and records every committed
//! statement. Used for `--pretend` runs, which print the SQL a run would
//! execute, and as the test double for the migrator.
//!
//! Only the DDL shapes the grammars emit for whole tables are interpreted
//! (`create table`, `drop table`, table renames). Everything else is recorded
//! and otherwise ignored.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::core::*;
use crate::error::{MigrationError, MigrationResult};
use crate::query::TableQuery;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: BTreeMap<String, Vec<DatabaseRow>>,
    statements: Vec<String>,
}

impl MemoryState {
    fn execute(&mut self, sql: &str, fail_on: &[String]) -> MigrationResult<u64> {
        if let Some(pattern) = fail_on.iter().find(|p| sql.contains(p.as_str())) {
            return Err(MigrationError::Database(format!(
                "statement rejected ({}): {}",
                pattern, sql
            )));
        }

        self.apply_ddl(sql)?;
        self.statements.push(sql.to_string());
        Ok(0)
    }

    fn apply_ddl(&mut self, sql: &str) -> MigrationResult<()> {
        let lowered = sql.trim().to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        match words.as_slice() {
            ["create", "table", "if", "not", "exists", name, ..] => {
                let name = table_token(name);
                self.tables.entry(name).or_default();
            }
            ["create", "table", name, ..] => {
                let name = table_token(name);
                if self.tables.contains_key(&name) {
                    return Err(MigrationError::Database(format!(
                        "relation \"{}\" already exists",
                        name
                    )));
                }
                self.tables.insert(name, Vec::new());
            }
            ["drop", "table", "if", "exists", rest @ ..] => {
                for name in table_list(rest) {
                    self.tables.remove(&name);
                }
            }
            ["drop", "table", rest @ ..] => {
                for name in table_list(rest) {
                    if self.tables.remove(&name).is_none() {
                        return Err(MigrationError::Database(format!(
                            "table \"{}\" does not exist",
                            name
                        )));
                    }
                }
            }
            ["alter", "table", from, "rename", "to", to] | ["rename", "table", from, "to", to] => {
                let rows = self.tables.remove(*from).ok_or_else(|| {
                    MigrationError::Database(format!("relation \"{}\" does not exist", from))
                })?;
                self.tables.insert(to.to_string(), rows);
            }
            _ => {}
        }
        Ok(())
    }

    fn rows(&self, table: &str) -> MigrationResult<&Vec<DatabaseRow>> {
        self.tables
            .get(table)
            .ok_or_else(|| MigrationError::Database(format!("relation \"{}\" does not exist", table)))
    }

    fn select(&self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>> {
        Ok(query.apply(self.rows(&query.table)?))
    }

    fn insert(&mut self, table: &str, values: &[(&str, DatabaseValue)]) -> MigrationResult<u64> {
        let rows = self.tables.get_mut(table).ok_or_else(|| {
            MigrationError::Database(format!("relation \"{}\" does not exist", table))
        })?;

        let mut row = DatabaseRow::new();
        if !values.iter().any(|(column, _)| *column == "id") {
            let next_id = rows.iter().filter_map(|r| r.get_i64("id")).max().unwrap_or(0) + 1;
            row.insert("id", next_id);
        }
        for (column, value) in values {
            row.insert(*column, value.clone());
        }
        rows.push(row);
        Ok(1)
    }

    fn delete(&mut self, query: &TableQuery) -> MigrationResult<u64> {
        let rows = self.tables.get_mut(&query.table).ok_or_else(|| {
            MigrationError::Database(format!("relation \"{}\" does not exist", query.table))
        })?;

        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        Ok((before - rows.len()) as u64)
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

/// `users (` / `users(` / `users,` → `users`
fn table_token(token: &str) -> String {
    token
        .split(|c: char| c == '(' || c == ',')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn table_list(words: &[&str]) -> Vec<String> {
    words
        .iter()
        .filter(|w| **w != "cascade")
        .flat_map(|w| w.split(','))
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// In-memory query executor
#[derive(Clone)]
pub struct MemoryExecutor {
    dialect: SqlDialect,
    state: Arc<Mutex<MemoryState>>,
    fail_on: Arc<Mutex<Vec<String>>>,
}

impl MemoryExecutor {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(MemoryState::default())),
            fail_on: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed empty tables, e.g. the tables of a real connection for a pretend run
    pub fn with_tables<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = lock(&self.state);
            for table in tables {
                state.tables.entry(table.into()).or_default();
            }
        }
        self
    }

    /// Reject every later statement containing `pattern`
    pub fn fail_on(&self, pattern: impl Into<String>) {
        lock(&self.fail_on).push(pattern.into());
    }

    pub fn clear_failures(&self) {
        lock(&self.fail_on).clear();
    }

    /// Committed statements, in execution order
    pub fn statements(&self) -> Vec<String> {
        lock(&self.state).statements.clone()
    }

    /// Take the committed statements, leaving the log empty
    pub fn take_statements(&self) -> Vec<String> {
        std::mem::take(&mut lock(&self.state).statements)
    }

    /// Rows currently stored in `table`
    pub fn rows(&self, table: &str) -> Vec<DatabaseRow> {
        lock(&self.state).tables.get(table).cloned().unwrap_or_default()
    }

    fn failures(&self) -> Vec<String> {
        lock(&self.fail_on).clone()
    }
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new(SqlDialect::PostgreSQL)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn execute(&self, sql: &str, _params: &[DatabaseValue]) -> MigrationResult<u64> {
        debug!("{}", sql);
        let failures = self.failures();
        lock(&self.state).execute(sql, &failures)
    }

    async fn select(&self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>> {
        lock(&self.state).select(query)
    }

    async fn insert(&self, table: &str, values: &[(&str, DatabaseValue)]) -> MigrationResult<u64> {
        lock(&self.state).insert(table, values)
    }

    async fn delete(&self, query: &TableQuery) -> MigrationResult<u64> {
        lock(&self.state).delete(query)
    }

    async fn table_names(&self) -> MigrationResult<Vec<String>> {
        Ok(lock(&self.state).table_names())
    }

    async fn begin_transaction(&self) -> MigrationResult<Box<dyn DatabaseTransaction>> {
        let working = lock(&self.state).clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.state),
            working,
            fail_on: self.failures(),
        }))
    }
}

/// Transaction over a private copy of the state; commit publishes the copy,
/// drop discards it
pub struct MemoryTransaction {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
    fail_on: Vec<String>,
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn execute(&mut self, sql: &str, _params: &[DatabaseValue]) -> MigrationResult<u64> {
        debug!("{}", sql);
        self.working.execute(sql, &self.fail_on)
    }

    async fn select(&mut self, query: &TableQuery) -> MigrationResult<Vec<DatabaseRow>> {
        self.working.select(query)
    }

    async fn table_names(&mut self) -> MigrationResult<Vec<String>> {
        Ok(self.working.table_names())
    }

    async fn commit(self: Box<Self>) -> MigrationResult<()> {
        let MemoryTransaction { shared, working, .. } = *self;
        *lock(&shared) = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigrationResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracks_created_and_dropped_tables() {
        let executor = MemoryExecutor::default();
        executor.execute("create table users (id bigserial primary key)", &[]).await.unwrap();
        executor.execute("create table posts (id bigserial)", &[]).await.unwrap();
        assert_eq!(executor.table_names().await.unwrap(), vec!["posts", "users"]);

        executor.execute("alter table posts rename to articles", &[]).await.unwrap();
        assert!(executor.has_table("articles").await.unwrap());

        executor.execute("drop table articles, users cascade", &[]).await.unwrap();
        assert!(executor.table_names().await.unwrap().is_empty());

        assert!(executor.execute("drop table users", &[]).await.is_err());
        executor.execute("drop table if exists users", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_ledger_crud() {
        let executor = MemoryExecutor::default();
        executor.execute("create table migrations (id bigserial primary key)", &[]).await.unwrap();

        executor
            .insert("migrations", &[("migration", "a".into()), ("batch", 1i64.into())])
            .await
            .unwrap();
        executor
            .insert("migrations", &[("migration", "b".into()), ("batch", 2i64.into())])
            .await
            .unwrap();

        let rows = executor
            .select(&TableQuery::table("migrations").order_by_desc("batch"))
            .await
            .unwrap();
        assert_eq!(rows[0].get_string("migration").as_deref(), Some("b"));
        assert_eq!(rows[0].get_i64("id"), Some(2));

        let deleted = executor
            .delete(&TableQuery::table("migrations").where_eq("migration", "a"))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(executor.rows("migrations").len(), 1);
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let executor = MemoryExecutor::default();

        let mut tx = executor.begin_transaction().await.unwrap();
        tx.execute("create table users (id integer)", &[]).await.unwrap();
        assert_eq!(tx.table_names().await.unwrap(), vec!["users"]);
        drop(tx);
        assert!(!executor.has_table("users").await.unwrap());

        let mut tx = executor.begin_transaction().await.unwrap();
        tx.execute("create table users (id integer)", &[]).await.unwrap();
        tx.commit().await.unwrap();
        assert!(executor.has_table("users").await.unwrap());
        assert_eq!(executor.statements(), vec!["create table users (id integer)"]);
    }

    #[tokio::test]
    async fn test_seeded_tables() {
        let executor = MemoryExecutor::new(SqlDialect::MySQL).with_tables(["users", "posts"]);
        assert_eq!(executor.table_names().await.unwrap(), vec!["posts", "users"]);
        assert!(executor.statements().is_empty());
        assert!(executor.execute("create table users (id int)", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_on_pattern() {
        let executor = MemoryExecutor::default();
        executor.fail_on("broken");

        let err = executor.execute("create table broken (id integer)", &[]).await.unwrap_err();
        assert!(matches!(err, MigrationError::Database(_)));
        assert!(executor.statements().is_empty());

        executor.clear_failures();
        executor.execute("create table broken (id integer)", &[]).await.unwrap();
    }
}
