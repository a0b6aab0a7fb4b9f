//! Migration Repository - the ledger of migrations that have run
//!
//! One row per applied migration: `id`, `migration` (signature) and `batch`.

use async_trait::async_trait;

use crate::definitions::MigrationRecord;
use crate::error::{MigrationError, MigrationResult};
use crate::query::TableQuery;
use crate::schema::Connection;

/// Persistence of which migrations ran in which batch
#[async_trait]
pub trait MigrationRepository: Send + Sync {
    /// Create the ledger table
    async fn create_repository(&self) -> MigrationResult<()>;

    /// Whether the ledger table exists
    async fn repository_exists(&self) -> MigrationResult<bool>;

    /// Drop the ledger table
    async fn delete_repository(&self) -> MigrationResult<()>;

    /// Record that a migration ran in `batch`
    async fn log(&self, migration: &str, batch: i64) -> MigrationResult<()>;

    /// Remove the record of a rolled back migration
    async fn delete(&self, migration: &str) -> MigrationResult<()>;

    /// Signatures of every migration that ran, ordered by batch then signature
    async fn get_ran(&self) -> MigrationResult<Vec<String>>;

    /// Highest batch number, 0 when the ledger is empty
    async fn get_last_batch_number(&self) -> MigrationResult<i64>;

    /// Batch number for the next run
    async fn get_next_batch_number(&self) -> MigrationResult<i64> {
        Ok(self.get_last_batch_number().await? + 1)
    }

    /// Records of the most recent batch, newest first
    async fn get_last(&self) -> MigrationResult<Vec<MigrationRecord>>;

    /// Records of one batch, newest first
    async fn get_migrations_by_batch(&self, batch: i64) -> MigrationResult<Vec<MigrationRecord>>;

    /// The `steps` most recent records across all batches
    async fn get_migrations_by_step(&self, steps: usize) -> MigrationResult<Vec<MigrationRecord>>;

    /// Every record, newest first
    async fn get_migrations(&self) -> MigrationResult<Vec<MigrationRecord>>;
}

/// Ledger stored in a table on the default connection
pub struct DatabaseMigrationRepository {
    connection: Connection,
    table: String,
}

impl DatabaseMigrationRepository {
    pub fn new(connection: Connection, table: impl Into<String>) -> Self {
        Self {
            connection,
            table: table.into(),
        }
    }

    /// Ledger table name including the connection prefix
    pub fn table_name(&self) -> String {
        self.connection.prefixed(&self.table)
    }

    fn query(&self) -> TableQuery {
        TableQuery::table(self.table_name())
    }

    async fn records(&self, query: TableQuery) -> MigrationResult<Vec<MigrationRecord>> {
        let rows = self.connection.executor().select(&query).await?;
        rows.iter()
            .map(|row| {
                MigrationRecord::from_row(row).ok_or_else(|| {
                    MigrationError::Database(format!(
                        "Malformed row in '{}': {}",
                        self.table_name(),
                        row.to_json()
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl MigrationRepository for DatabaseMigrationRepository {
    async fn create_repository(&self) -> MigrationResult<()> {
        self.connection
            .create(&self.table, |table| {
                table.id();
                table.string("migration", None);
                table.integer("batch");
            })
            .await
    }

    async fn repository_exists(&self) -> MigrationResult<bool> {
        self.connection.has_table(&self.table).await
    }

    async fn delete_repository(&self) -> MigrationResult<()> {
        self.connection.drop_if_exists(&self.table).await
    }

    async fn log(&self, migration: &str, batch: i64) -> MigrationResult<()> {
        self.connection
            .executor()
            .insert(
                &self.table_name(),
                &[("migration", migration.into()), ("batch", batch.into())],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, migration: &str) -> MigrationResult<()> {
        self.connection
            .executor()
            .delete(&self.query().where_eq("migration", migration))
            .await?;
        Ok(())
    }

    async fn get_ran(&self) -> MigrationResult<Vec<String>> {
        let records = self
            .records(self.query().order_by("batch").order_by("migration"))
            .await?;
        Ok(records.into_iter().map(|r| r.migration).collect())
    }

    async fn get_last_batch_number(&self) -> MigrationResult<i64> {
        let rows = self
            .connection
            .executor()
            .select(&self.query().select(&["batch"]).order_by_desc("batch").limit(1))
            .await?;
        Ok(rows.first().and_then(|row| row.get_i64("batch")).unwrap_or(0))
    }

    async fn get_last(&self) -> MigrationResult<Vec<MigrationRecord>> {
        match self.get_last_batch_number().await? {
            0 => Ok(Vec::new()),
            batch => self.get_migrations_by_batch(batch).await,
        }
    }

    async fn get_migrations_by_batch(&self, batch: i64) -> MigrationResult<Vec<MigrationRecord>> {
        self.records(
            self.query()
                .where_eq("batch", batch)
                .order_by_desc("migration"),
        )
        .await
    }

    async fn get_migrations_by_step(&self, steps: usize) -> MigrationResult<Vec<MigrationRecord>> {
        self.records(
            self.query()
                .where_gte("batch", 1i64)
                .order_by_desc("batch")
                .order_by_desc("migration")
                .limit(steps),
        )
        .await
    }

    async fn get_migrations(&self) -> MigrationResult<Vec<MigrationRecord>> {
        self.records(
            self.query()
                .order_by_desc("batch")
                .order_by_desc("migration"),
        )
        .await
    }
}
