//! Schema registry, connections and the blueprint DSL
//!
//! [`Schema`] binds the registered migrations to named connections. Each
//! [`Connection`] pairs an executor with the grammar of its dialect and the
//! table prefix used on it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

pub mod blueprint;
pub mod builder;
pub mod column;
pub mod command;
pub mod grammars;

pub use blueprint::Blueprint;
pub use builder::SchemaBuilder;
pub use column::{ColumnDefinition, ColumnType, DefaultValue};
pub use command::{Command, CommandKind, ForeignKeyDefinition, IndexDefinition};
pub use grammars::{Grammar, MySqlGrammar, PostgresGrammar, SqliteGrammar};

use crate::backends::QueryExecutor;
use crate::error::{MigrationError, MigrationResult};
use crate::migration::Migration;

/// A named database connection
#[derive(Clone)]
pub struct Connection {
    name: String,
    executor: Arc<dyn QueryExecutor>,
    grammar: Arc<dyn Grammar>,
    prefix: String,
}

impl Connection {
    /// Bind `executor` under `name`, using the grammar of its dialect
    pub fn new(name: impl Into<String>, executor: Arc<dyn QueryExecutor>) -> Self {
        let grammar = executor.dialect().grammar();
        Self {
            name: name.into(),
            executor,
            grammar,
            prefix: String::new(),
        }
    }

    /// Table prefix applied to every table on this connection
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replace the dialect grammar
    pub fn with_grammar(mut self, grammar: Arc<dyn Grammar>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Table name with the connection prefix applied
    pub fn prefixed(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    /// Create a table directly on the connection, outside any transaction
    pub async fn create<F>(&self, table: &str, callback: F) -> MigrationResult<()>
    where
        F: FnOnce(&mut Blueprint) + Send,
    {
        let mut blueprint = Blueprint::new(table, self.prefix.clone());
        blueprint.create();
        callback(&mut blueprint);
        self.build(&blueprint).await
    }

    pub async fn drop_if_exists(&self, table: &str) -> MigrationResult<()> {
        let mut blueprint = Blueprint::new(table, self.prefix.clone());
        blueprint.drop_if_exists();
        self.build(&blueprint).await
    }

    pub async fn has_table(&self, table: &str) -> MigrationResult<bool> {
        self.executor.has_table(&self.prefixed(table)).await
    }

    /// Drop every table visible on the connection
    pub async fn drop_all_tables(&self) -> MigrationResult<()> {
        let tables = self.executor.table_names().await?;
        for statement in self.grammar.compile_drop_all_tables(&tables) {
            debug!(connection = %self.name, "{}", statement);
            self.executor.execute(&statement, &[]).await?;
        }
        Ok(())
    }

    async fn build(&self, blueprint: &Blueprint) -> MigrationResult<()> {
        for statement in blueprint.to_sql(self.grammar.as_ref())? {
            debug!(connection = %self.name, "{}", statement);
            self.executor.execute(&statement, &[]).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("dialect", &self.executor.dialect())
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Registered migrations plus the connections they run on
pub struct Schema {
    migrations: Vec<Box<dyn Migration>>,
    default_connection: Connection,
    connections: HashMap<String, Connection>,
}

impl Schema {
    pub fn new(default_connection: Connection) -> Self {
        Self {
            migrations: Vec::new(),
            default_connection,
            connections: HashMap::new(),
        }
    }

    /// Register an additional named connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.insert(connection.name.clone(), connection);
        self
    }

    /// Register a migration; registration order is run order
    pub fn register<M>(mut self, migration: M) -> Self
    where
        M: Migration + 'static,
    {
        self.migrations.push(Box::new(migration));
        self
    }

    pub fn register_all(mut self, migrations: Vec<Box<dyn Migration>>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    pub fn migrations(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// Find a registered migration by signature
    pub fn find(&self, signature: &str) -> Option<&dyn Migration> {
        self.migrations
            .iter()
            .find(|m| m.signature() == signature)
            .map(|m| m.as_ref())
    }

    pub fn default_connection(&self) -> &Connection {
        &self.default_connection
    }

    /// Resolve a connection name; `None` is the default connection
    pub fn connection(&self, name: Option<&str>) -> MigrationResult<&Connection> {
        match name {
            None => Ok(&self.default_connection),
            Some(name) if name == self.default_connection.name => Ok(&self.default_connection),
            Some(name) => self
                .connections
                .get(name)
                .ok_or_else(|| MigrationError::UnknownConnection(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryExecutor, SqlDialect};

    #[test]
    fn test_connection_resolution() {
        let schema = Schema::new(Connection::new("default", Arc::new(MemoryExecutor::default())))
            .with_connection(Connection::new(
                "legacy",
                Arc::new(MemoryExecutor::new(SqlDialect::MySQL)),
            ));

        assert_eq!(schema.connection(None).unwrap().name(), "default");
        assert_eq!(schema.connection(Some("default")).unwrap().name(), "default");

        let legacy = schema.connection(Some("legacy")).unwrap();
        assert_eq!(legacy.grammar().dialect(), SqlDialect::MySQL);

        let err = schema.connection(Some("missing")).unwrap_err();
        assert!(matches!(err, MigrationError::UnknownConnection(_)));
    }

    #[tokio::test]
    async fn test_connection_table_helpers() {
        let executor = MemoryExecutor::default();
        let connection = Connection::new("default", Arc::new(executor.clone())).with_prefix("app_");

        connection
            .create("users", |table| {
                table.id();
            })
            .await
            .unwrap();
        assert!(connection.has_table("users").await.unwrap());
        assert!(executor.has_table("app_users").await.unwrap());

        executor.execute("create table other (id integer)", &[]).await.unwrap();
        connection.drop_all_tables().await.unwrap();
        assert!(executor.table_names().await.unwrap().is_empty());
        assert_eq!(
            executor.statements().last().map(String::as_str),
            Some("drop table app_users, other cascade")
        );

        // nothing to drop, nothing executed
        let before = executor.statements().len();
        connection.drop_all_tables().await.unwrap();
        assert_eq!(executor.statements().len(), before);
    }
}
