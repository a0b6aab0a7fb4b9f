//! Migration Definitions - ledger rows and run results

use serde::{Deserialize, Serialize};

use crate::backends::DatabaseRow;

/// One row of the migrations ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: i64,
    /// Signature of the migration that ran
    pub migration: String,
    /// Batch the migration ran in (1-based)
    pub batch: i64,
}

impl MigrationRecord {
    /// Build a record from a ledger row, `None` when a column is missing
    pub fn from_row(row: &DatabaseRow) -> Option<Self> {
        Some(Self {
            id: row.get_i64("id").unwrap_or_default(),
            migration: row.get_string("migration")?,
            batch: row.get_i64("batch")?,
        })
    }
}

/// Registered migration joined with its ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub name: String,
    /// Batch number, 0 when the migration has not run
    pub batch: i64,
    pub ran: bool,
}

/// Result of running migrations
#[derive(Debug, Clone, Default)]
pub struct MigrationRunResult {
    /// Signatures that were applied, in order
    pub applied_migrations: Vec<String>,
    /// Batch the migrations were logged under, 0 when nothing ran
    pub batch: i64,
    /// Number of registered migrations that had already run
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }
}

/// Result of rolling back migrations
#[derive(Debug, Clone, Default)]
pub struct RollbackResult {
    /// Signatures that were rolled back, in order
    pub rolled_back_migrations: Vec<String>,
    /// Ledger entries with no registered migration
    pub missing_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RollbackResult {
    pub fn rolled_back_count(&self) -> usize {
        self.rolled_back_migrations.len()
    }
}

/// SQL a pending migration would execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PretendedMigration {
    pub signature: String,
    pub statements: Vec<String>,
}
