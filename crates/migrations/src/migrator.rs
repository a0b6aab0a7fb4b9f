//! Migrator - runs, rolls back and reports on registered migrations
//!
//! Every migration runs in its own transaction on the connection it asks
//! for. The ledger row is written on the default connection once that
//! transaction has committed, so a failing migration leaves neither schema
//! changes nor a ledger row behind, while the migrations before it in the
//! same run stay applied.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use strata_codegen::{generate, CreatedMigration, MigrationCreator, ModelDescriptor};
use tracing::{error, info, warn};

use crate::backends::{DatabaseTransaction, MemoryExecutor, QueryExecutor};
use crate::config::MigrationConfig;
use crate::definitions::{
    MigrationRecord, MigrationRunResult, MigrationStatus, PretendedMigration, RollbackResult,
};
use crate::error::MigrationResult;
use crate::migration::Migration;
use crate::repository::{DatabaseMigrationRepository, MigrationRepository};
use crate::schema::{Connection, Schema, SchemaBuilder};

pub struct Migrator {
    schema: Schema,
    repository: Box<dyn MigrationRepository>,
    config: MigrationConfig,
}

impl Migrator {
    /// Migrator keeping its ledger in `config.migrations_table` on the
    /// default connection
    pub fn new(schema: Schema, config: MigrationConfig) -> Self {
        let repository = DatabaseMigrationRepository::new(
            schema.default_connection().clone(),
            config.migrations_table.clone(),
        );
        Self {
            schema,
            repository: Box::new(repository),
            config,
        }
    }

    /// Replace the ledger
    pub fn with_repository<R>(mut self, repository: R) -> Self
    where
        R: MigrationRepository + 'static,
    {
        self.repository = Box::new(repository);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn repository(&self) -> &dyn MigrationRepository {
        self.repository.as_ref()
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run every pending migration in one new batch
    pub async fn run(&self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();

        if !self.repository.repository_exists().await? {
            self.repository.create_repository().await?;
            info!("Migration table created successfully.");
        }

        let ran: HashSet<String> = self.repository.get_ran().await?.into_iter().collect();
        let pending = self.pending(&ran);
        let skipped_count = self.schema.migrations().len() - pending.len();

        if pending.is_empty() {
            info!("Nothing to migrate");
            return Ok(MigrationRunResult {
                skipped_count,
                execution_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        let batch = self.repository.get_next_batch_number().await?;
        let mut applied_migrations = Vec::with_capacity(pending.len());

        for migration in pending {
            if let Err(err) = self.run_up(migration, batch).await {
                error!("Migration {} failed: {}", migration.signature(), err);
                return Err(err);
            }
            applied_migrations.push(migration.signature().to_string());
        }

        Ok(MigrationRunResult {
            applied_migrations,
            batch,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Roll back the `step` most recent migrations, or batch `batch`, or
    /// (both zero) the last batch
    pub async fn rollback(&self, step: usize, batch: i64) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();

        if !self.repository.repository_exists().await? {
            warn!("Migration table not found.");
            return Ok(RollbackResult::default());
        }

        let records = self.rollback_targets(step, batch).await?;
        if records.is_empty() {
            info!("Nothing to rollback");
            return Ok(RollbackResult {
                execution_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        let mut result = RollbackResult::default();
        for record in records {
            let Some(migration) = self.schema.find(&record.migration) else {
                warn!("Migration not found: {}", record.migration);
                result.missing_migrations.push(record.migration);
                continue;
            };

            if let Err(err) = self.run_down(migration).await {
                error!("Rollback of {} failed: {}", record.migration, err);
                return Err(err);
            }
            result.rolled_back_migrations.push(record.migration);
        }

        result.execution_time_ms = start_time.elapsed().as_millis();
        Ok(result)
    }

    /// Roll back every migration that has run
    pub async fn reset(&self) -> MigrationResult<RollbackResult> {
        if !self.repository.repository_exists().await? {
            warn!("Migration table not found.");
            return Ok(RollbackResult::default());
        }

        let ran = self.repository.get_ran().await?.len();
        if ran == 0 {
            info!("Nothing to rollback");
            return Ok(RollbackResult::default());
        }
        self.rollback(ran, 0).await
    }

    /// Drop every table on the default connection, then run all migrations
    pub async fn fresh(&self) -> MigrationResult<MigrationRunResult> {
        self.schema.default_connection().drop_all_tables().await?;
        info!("Dropped all tables successfully.");
        self.run().await
    }

    /// Every registered migration with its ledger state
    pub async fn status(&self) -> MigrationResult<Vec<MigrationStatus>> {
        if !self.repository.repository_exists().await? {
            warn!("Migration table not found.");
            return Ok(Vec::new());
        }

        let batches: HashMap<String, i64> = self
            .repository
            .get_migrations()
            .await?
            .into_iter()
            .map(|record| (record.migration, record.batch))
            .collect();

        Ok(self
            .schema
            .migrations()
            .iter()
            .map(|migration| {
                let signature = migration.signature();
                match batches.get(signature) {
                    Some(batch) => MigrationStatus {
                        name: signature.to_string(),
                        batch: *batch,
                        ran: true,
                    },
                    None => MigrationStatus {
                        name: signature.to_string(),
                        batch: 0,
                        ran: false,
                    },
                }
            })
            .collect())
    }

    /// Scaffold a migration file, from `model` when given
    pub fn create(&self, name: &str, model: Option<&str>) -> MigrationResult<CreatedMigration> {
        create_migration(&self.config, name, model)
    }

    /// Compile the pending migrations against in-memory copies of their
    /// connections and return the SQL each would execute
    pub async fn pretend(&self) -> MigrationResult<Vec<PretendedMigration>> {
        let ran: HashSet<String> = if self.repository.repository_exists().await? {
            self.repository.get_ran().await?.into_iter().collect()
        } else {
            HashSet::new()
        };

        let mut shadows: HashMap<String, MemoryExecutor> = HashMap::new();
        let mut pretended = Vec::new();

        for migration in self.pending(&ran) {
            let connection = self.schema.connection(migration.connection())?;
            if !shadows.contains_key(connection.name()) {
                let tables = connection.executor().table_names().await?;
                let shadow = MemoryExecutor::new(connection.executor().dialect()).with_tables(tables);
                shadows.insert(connection.name().to_string(), shadow);
            }
            let shadow = shadows[connection.name()].clone();

            let mut transaction = shadow.begin_transaction().await?;
            let outcome = {
                let mut builder = builder_for(connection, transaction.as_mut());
                migration.up(&mut builder).await
            };
            finish(transaction, outcome, migration.signature()).await?;

            pretended.push(PretendedMigration {
                signature: migration.signature().to_string(),
                statements: shadow.take_statements(),
            });
        }

        Ok(pretended)
    }

    fn pending<'a>(&'a self, ran: &HashSet<String>) -> Vec<&'a dyn Migration> {
        self.schema
            .migrations()
            .iter()
            .filter(|migration| !ran.contains(migration.signature()))
            .map(|migration| migration.as_ref())
            .collect()
    }

    async fn rollback_targets(&self, step: usize, batch: i64) -> MigrationResult<Vec<MigrationRecord>> {
        if step > 0 {
            self.repository.get_migrations_by_step(step).await
        } else if batch > 0 {
            self.repository.get_migrations_by_batch(batch).await
        } else {
            self.repository.get_last().await
        }
    }

    async fn run_up(&self, migration: &dyn Migration, batch: i64) -> MigrationResult<()> {
        let connection = self.schema.connection(migration.connection())?;
        info!("Running: {}", migration.signature());

        let mut transaction = connection.executor().begin_transaction().await?;
        let outcome = {
            let mut builder = builder_for(connection, transaction.as_mut());
            migration.up(&mut builder).await
        };
        finish(transaction, outcome, migration.signature()).await?;

        self.repository.log(migration.signature(), batch).await?;
        info!("Ran: {}", migration.signature());
        Ok(())
    }

    async fn run_down(&self, migration: &dyn Migration) -> MigrationResult<()> {
        let connection = self.schema.connection(migration.connection())?;
        info!("Rolling back: {}", migration.signature());

        let mut transaction = connection.executor().begin_transaction().await?;
        let outcome = {
            let mut builder = builder_for(connection, transaction.as_mut());
            migration.down(&mut builder).await
        };
        finish(transaction, outcome, migration.signature()).await?;

        self.repository.delete(migration.signature()).await?;
        info!("Rolled back: {}", migration.signature());
        Ok(())
    }
}

/// Scaffold a migration file without a database connection
pub fn create_migration(
    config: &MigrationConfig,
    name: &str,
    model: Option<&str>,
) -> MigrationResult<CreatedMigration> {
    let schema = match model {
        Some(model) => Some(generate(&ModelDescriptor::load(&config.models_dir, model)?)?),
        None => None,
    };
    let creator = MigrationCreator::new(&config.migrations_dir)?;
    Ok(creator.create(name, schema.as_ref())?)
}

fn builder_for<'a>(
    connection: &Connection,
    transaction: &'a mut dyn DatabaseTransaction,
) -> SchemaBuilder<'a> {
    SchemaBuilder::new(
        connection.name(),
        Arc::clone(connection.grammar()),
        connection.prefix(),
        transaction,
    )
}

/// Commit on success; otherwise roll back and return the migration's error
async fn finish(
    transaction: Box<dyn DatabaseTransaction>,
    outcome: MigrationResult<()>,
    signature: &str,
) -> MigrationResult<()> {
    match outcome {
        Ok(()) => transaction.commit().await,
        Err(err) => {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!("Rolling back the transaction of {} failed: {}", signature, rollback_err);
            }
            Err(err)
        }
    }
}

