use std::sync::Arc;

use strata_cli::{CliError, Commands, Console, StrataConfig};
use strata_migrations::{
    async_trait, Connection, MemoryExecutor, Migration, MigrationResult, QueryExecutor, Schema,
    SchemaBuilder, SqlDialect,
};

struct CreatePosts;

#[async_trait]
impl Migration for CreatePosts {
    fn signature(&self) -> &str {
        "20240101000000_create_posts_table"
    }

    async fn up(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema
            .create("posts", |table| {
                table.id();
                table.string("title", Some(120));
            })
            .await
    }

    async fn down(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema.drop_if_exists("posts").await
    }
}

fn console(executor: &MemoryExecutor) -> Console {
    Console::new()
        .with_schema(Schema::new(Connection::new("default", Arc::new(executor.clone()))))
        .register(CreatePosts)
}

#[tokio::test]
async fn test_migrate_then_rollback() {
    let executor = MemoryExecutor::new(SqlDialect::PostgreSQL);
    let config = StrataConfig::default();

    console(&executor)
        .execute(&config, &Commands::Migrate { pretend: false })
        .await
        .unwrap();
    assert!(executor.has_table("posts").await.unwrap());
    assert!(executor.has_table("migrations").await.unwrap());

    console(&executor)
        .execute(&config, &Commands::Rollback { step: 0, batch: 0 })
        .await
        .unwrap();
    assert!(!executor.has_table("posts").await.unwrap());
}

#[tokio::test]
async fn test_pretend_leaves_database_untouched() {
    let executor = MemoryExecutor::new(SqlDialect::PostgreSQL);
    let config = StrataConfig::default();

    console(&executor)
        .execute(&config, &Commands::Migrate { pretend: true })
        .await
        .unwrap();
    assert!(!executor.has_table("posts").await.unwrap());
}

#[tokio::test]
async fn test_status_and_fresh() {
    let executor = MemoryExecutor::new(SqlDialect::PostgreSQL);
    let config = StrataConfig::default();

    console(&executor).execute(&config, &Commands::Fresh).await.unwrap();
    console(&executor).execute(&config, &Commands::Status).await.unwrap();

    let migrator = console(&executor).migrator(&config).await.unwrap();
    let status = migrator.status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert!(status[0].ran);
    assert_eq!(status[0].batch, 1);
}

#[tokio::test]
async fn test_database_command_without_migrations() {
    let executor = MemoryExecutor::new(SqlDialect::PostgreSQL);
    let err = Console::new()
        .with_schema(Schema::new(Connection::new("default", Arc::new(executor))))
        .execute(&StrataConfig::default(), &Commands::Status)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NoMigrations));
}

#[tokio::test]
async fn test_missing_database_url() {
    let err = Console::new()
        .register(CreatePosts)
        .execute(&StrataConfig::default(), &Commands::Reset)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Migration(_)));
}

#[tokio::test]
async fn test_make_migration_needs_no_database() {
    let root = tempfile::tempdir().unwrap();
    let mut config = StrataConfig::default();
    config.migrations.migrations_dir = root.path().join("migrations");

    Console::new()
        .execute(
            &config,
            &Commands::MakeMigration {
                name: "create_comments_table".to_string(),
                model: None,
            },
        )
        .await
        .unwrap();

    let files: Vec<String> = std::fs::read_dir(&config.migrations.migrations_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|name| name.ends_with("_create_comments_table.rs")));
    assert!(files.iter().any(|name| name == "mod.rs"));
}
