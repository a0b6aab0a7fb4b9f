use clap::Parser;
use strata_cli::{Cli, Commands, Console};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.command.needs_database() {
        anyhow::bail!(
            "`{}` needs the application's migrations; run it through the application's Console",
            command_name(&cli.command)
        );
    }

    Console::new().run_with(cli).await?;
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Migrate { .. } => "migrate",
        Commands::Rollback { .. } => "migrate:rollback",
        Commands::Reset => "migrate:reset",
        Commands::Fresh => "migrate:fresh",
        Commands::Status => "migrate:status",
        Commands::MakeMigration { .. } => "make:migration",
    }
}
