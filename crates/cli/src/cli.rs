use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "Database schema migrations")]
#[command(version)]
pub struct Cli {
    /// Configuration file, `strata.toml` in the working directory by default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the pending migrations
    #[command(name = "migrate")]
    Migrate {
        /// Print the SQL the pending migrations would execute instead of running them
        #[arg(long)]
        pretend: bool,
    },

    /// Roll back the last batch of migrations
    #[command(name = "migrate:rollback")]
    Rollback {
        /// Number of most recent migrations to roll back
        #[arg(long, default_value_t = 0)]
        step: usize,
        /// Roll back this batch instead of the last one
        #[arg(long, default_value_t = 0)]
        batch: i64,
    },

    /// Roll back every migration
    #[command(name = "migrate:reset")]
    Reset,

    /// Drop all tables and run every migration
    #[command(name = "migrate:fresh")]
    Fresh,

    /// Show which migrations have run
    #[command(name = "migrate:status")]
    Status,

    /// Create a new migration file
    #[command(name = "make:migration")]
    MakeMigration {
        /// Migration name, e.g. create_users_table
        name: String,
        /// Generate the table definition from this model
        #[arg(long)]
        model: Option<String>,
    },
}

impl Commands {
    /// Whether the command talks to the database
    pub fn needs_database(&self) -> bool {
        !matches!(self, Commands::MakeMigration { .. })
    }
}
