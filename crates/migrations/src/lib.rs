//! # strata-migrations: Schema Migrations
//!
//! Tracks, applies and reverses schema changes, and compiles table
//! blueprints into dialect-specific SQL.
//!
//! Migrations implement [`Migration`] and are registered on a [`Schema`]
//! together with the connections they run on. The [`Migrator`] runs them in
//! batches, recording each in the ledger table, and rolls them back by step,
//! by batch or all at once.

pub mod backends;
pub mod config;
pub mod definitions;
pub mod error;
pub mod migration;
pub mod migrator;
pub mod query;
pub mod repository;
pub mod schema;

// Re-export core traits and types
pub use backends::{
    DatabaseRow, DatabaseTransaction, DatabaseValue, MemoryExecutor, PostgresExecutor,
    QueryExecutor, SqlDialect,
};
pub use config::MigrationConfig;
pub use definitions::{
    MigrationRecord, MigrationRunResult, MigrationStatus, PretendedMigration, RollbackResult,
};
pub use error::{MigrationError, MigrationResult};
pub use migration::Migration;
pub use migrator::{create_migration, Migrator};
pub use query::TableQuery;
pub use repository::{DatabaseMigrationRepository, MigrationRepository};
pub use schema::{
    Blueprint, ColumnDefinition, ColumnType, Command, CommandKind, Connection, DefaultValue,
    Grammar, MySqlGrammar, PostgresGrammar, Schema, SchemaBuilder, SqliteGrammar,
};

pub use async_trait::async_trait;
pub use strata_codegen::CreatedMigration;
