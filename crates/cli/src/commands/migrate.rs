//! Database commands and their console output

use strata_migrations::{
    MigrationRunResult, MigrationStatus, Migrator, PretendedMigration, RollbackResult,
};

use crate::cli::Commands;
use crate::error::CliResult;

/// Execute a database command against `migrator`
pub async fn dispatch(migrator: &Migrator, command: &Commands) -> CliResult<()> {
    let output = match command {
        Commands::Migrate { pretend: true } => render_pretend(&migrator.pretend().await?),
        Commands::Migrate { pretend: false } => render_run(&migrator.run().await?),
        Commands::Rollback { step, batch } => {
            render_rollback(&migrator.rollback(*step, *batch).await?)
        }
        Commands::Reset => render_rollback(&migrator.reset().await?),
        Commands::Fresh => render_run(&migrator.fresh().await?),
        Commands::Status => render_status(&migrator.status().await?),
        Commands::MakeMigration { .. } => return Ok(()),
    };

    print!("{}", output);
    Ok(())
}

pub fn render_run(result: &MigrationRunResult) -> String {
    if result.applied_migrations.is_empty() {
        return "Nothing to migrate.\n".to_string();
    }

    let mut output = String::new();
    for signature in &result.applied_migrations {
        output.push_str(&format!("  Migrated: {}\n", signature));
    }
    output.push_str(&format!(
        "Applied {} migration(s) in batch {} ({}ms)\n",
        result.applied_count(),
        result.batch,
        result.execution_time_ms
    ));
    output
}

pub fn render_rollback(result: &RollbackResult) -> String {
    let mut output = String::new();
    for signature in &result.rolled_back_migrations {
        output.push_str(&format!("  Rolled back: {}\n", signature));
    }
    for signature in &result.missing_migrations {
        output.push_str(&format!("  Migration not found: {}\n", signature));
    }

    if result.rolled_back_migrations.is_empty() {
        output.push_str("Nothing to rollback.\n");
    } else {
        output.push_str(&format!(
            "Rolled back {} migration(s) ({}ms)\n",
            result.rolled_back_count(),
            result.execution_time_ms
        ));
    }
    output
}

pub fn render_status(statuses: &[MigrationStatus]) -> String {
    if statuses.is_empty() {
        return "No migrations found.\n".to_string();
    }

    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0).max("Migration".len());
    let mut output = format!("{:<5} {:<width$} {}\n", "Ran?", "Migration", "Batch", width = width);
    for status in statuses {
        let (ran, batch) = if status.ran {
            ("Yes", status.batch.to_string())
        } else {
            ("No", String::new())
        };
        output.push_str(&format!("{:<5} {:<width$} {}\n", ran, status.name, batch, width = width));
    }
    output
}

pub fn render_pretend(pretended: &[PretendedMigration]) -> String {
    if pretended.is_empty() {
        return "Nothing to migrate.\n".to_string();
    }

    let mut output = String::new();
    for migration in pretended {
        output.push_str(&format!("-- {}\n", migration.signature));
        for statement in &migration.statements {
            output.push_str(statement);
            output.push_str(";\n");
        }
    }
    output
}
