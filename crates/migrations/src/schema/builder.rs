//! Schema Builder - the handle a migration uses to change the schema
//!
//! A [`SchemaBuilder`] is created for a single `up` / `down` call. It is bound
//! to the transaction of the connection that migration runs on, so a
//! connection override can never outlive the call that asked for it.

use std::sync::Arc;

use tracing::debug;

use super::blueprint::Blueprint;
use super::grammars::Grammar;
use crate::backends::DatabaseTransaction;
use crate::error::MigrationResult;

pub struct SchemaBuilder<'a> {
    connection: String,
    grammar: Arc<dyn Grammar>,
    prefix: String,
    transaction: &'a mut dyn DatabaseTransaction,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(
        connection: impl Into<String>,
        grammar: Arc<dyn Grammar>,
        prefix: impl Into<String>,
        transaction: &'a mut dyn DatabaseTransaction,
    ) -> Self {
        Self {
            connection: connection.into(),
            grammar,
            prefix: prefix.into(),
            transaction,
        }
    }

    /// Name of the connection this builder runs on
    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Create a new table
    pub async fn create<F>(&mut self, table: &str, callback: F) -> MigrationResult<()>
    where
        F: FnOnce(&mut Blueprint) + Send,
    {
        let mut blueprint = self.blueprint(table);
        blueprint.create();
        callback(&mut blueprint);
        self.build(blueprint).await
    }

    /// Alter an existing table
    pub async fn table<F>(&mut self, table: &str, callback: F) -> MigrationResult<()>
    where
        F: FnOnce(&mut Blueprint) + Send,
    {
        let mut blueprint = self.blueprint(table);
        callback(&mut blueprint);
        self.build(blueprint).await
    }

    pub async fn drop(&mut self, table: &str) -> MigrationResult<()> {
        let mut blueprint = self.blueprint(table);
        blueprint.drop();
        self.build(blueprint).await
    }

    pub async fn drop_if_exists(&mut self, table: &str) -> MigrationResult<()> {
        let mut blueprint = self.blueprint(table);
        blueprint.drop_if_exists();
        self.build(blueprint).await
    }

    /// Rename `from` to `to`; both names are unprefixed
    pub async fn rename(&mut self, from: &str, to: &str) -> MigrationResult<()> {
        let mut blueprint = self.blueprint(from);
        blueprint.rename(to);
        self.build(blueprint).await
    }

    /// Check whether a (prefixed) table exists
    pub async fn has_table(&mut self, table: &str) -> MigrationResult<bool> {
        let table = format!("{}{}", self.prefix, table);
        let tables = self.transaction.table_names().await?;
        Ok(tables.iter().any(|name| *name == table))
    }

    /// Execute a raw statement
    pub async fn sql(&mut self, sql: &str) -> MigrationResult<()> {
        debug!(connection = %self.connection, "{}", sql);
        self.transaction.execute(sql, &[]).await?;
        Ok(())
    }

    fn blueprint(&self, table: &str) -> Blueprint {
        Blueprint::new(table, self.prefix.clone())
    }

    async fn build(&mut self, blueprint: Blueprint) -> MigrationResult<()> {
        for statement in blueprint.to_sql(self.grammar.as_ref())? {
            self.sql(&statement).await?;
        }
        Ok(())
    }
}
