//! The `Migration` trait implemented by every migration file

use async_trait::async_trait;

use crate::error::MigrationResult;
use crate::schema::SchemaBuilder;

/// One reversible schema change.
///
/// The signature is `<YYYYMMDDHHMMSS>_<description>` and matches the stem of
/// the file the migration lives in. It is the key stored in the ledger, so it
/// must never change once the migration has run anywhere.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Stable unique identifier
    fn signature(&self) -> &str;

    /// Named connection to run on instead of the default one
    fn connection(&self) -> Option<&str> {
        None
    }

    /// Apply the change
    async fn up(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()>;

    /// Reverse the change
    async fn down(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()>;
}
