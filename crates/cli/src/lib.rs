//! # strata-cli
//!
//! Console commands for strata migrations. Migrations are compiled into the
//! application, so the database commands run through a [`Console`] the
//! application builds with its migrations; the `strata` binary on its own
//! only scaffolds new migration files.

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;

pub use cli::{Cli, Commands};
pub use config::{ConnectionConfig, StrataConfig, DEFAULT_CONFIG_FILE};
pub use console::Console;
pub use error::{CliError, CliResult};
pub use logging::{init_logging, LoggingConfig};
