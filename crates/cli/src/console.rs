//! Console an application embeds with its registered migrations
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Console::new().register_all(migrations::all()).run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use clap::Parser;
use strata_migrations::{Connection, Migration, Migrator, PostgresExecutor, Schema};
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::commands;
use crate::config::StrataConfig;
use crate::error::{CliError, CliResult};
use crate::logging::init_logging;

#[derive(Default)]
pub struct Console {
    migrations: Vec<Box<dyn Migration>>,
    schema: Option<Schema>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

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

    /// Use these connections instead of the ones in the configuration
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Parse the process arguments and execute the command
    pub async fn run(self) -> CliResult<()> {
        self.run_with(Cli::parse()).await
    }

    pub async fn run_with(self, cli: Cli) -> CliResult<()> {
        let config = StrataConfig::load(cli.config.as_deref())?;
        init_logging(&config.logging)?;
        self.execute(&config, &cli.command).await
    }

    /// Execute `command` with an already loaded configuration
    pub async fn execute(self, config: &StrataConfig, command: &Commands) -> CliResult<()> {
        if let Commands::MakeMigration { name, model } = command {
            commands::make::migration(&config.migrations, name, model.as_deref())?;
            return Ok(());
        }

        let migrator = self.migrator(config).await?;
        commands::migrate::dispatch(&migrator, command).await
    }

    /// Build the migrator, connecting to every configured database unless a
    /// schema was supplied
    pub async fn migrator(self, config: &StrataConfig) -> CliResult<Migrator> {
        if self.migrations.is_empty() {
            return Err(CliError::NoMigrations);
        }

        let schema = match self.schema {
            Some(schema) => schema,
            None => connect(config).await?,
        };

        Ok(Migrator::new(schema.register_all(self.migrations), config.migrations.clone()))
    }
}

async fn connect(config: &StrataConfig) -> CliResult<Schema> {
    let url = config.migrations.require_database_url()?;
    debug!("Connecting default connection '{}'", config.migrations.default_connection);
    let executor = PostgresExecutor::connect(url).await?;

    let mut schema = Schema::new(
        Connection::new(config.migrations.default_connection.clone(), Arc::new(executor))
            .with_prefix(config.migrations.prefix.clone()),
    );

    for (name, connection) in &config.connections {
        debug!("Connecting '{}'", name);
        let executor = PostgresExecutor::connect(&connection.url).await?;
        schema = schema.with_connection(
            Connection::new(name.clone(), Arc::new(executor)).with_prefix(connection.prefix.clone()),
        );
    }

    Ok(schema)
}
