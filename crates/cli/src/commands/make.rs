use strata_migrations::{create_migration, CreatedMigration, MigrationConfig};

use crate::error::CliResult;

/// `make:migration <name> [--model M]`
pub fn migration(
    config: &MigrationConfig,
    name: &str,
    model: Option<&str>,
) -> CliResult<CreatedMigration> {
    let created = create_migration(config, name, model)?;

    println!("Created migration: {}", created.path.display());
    if let Some(guess) = &created.table {
        let action = if guess.create { "creates" } else { "updates" };
        println!("  {} table: {}", action, guess.table);
    }
    println!("Register it through `migrations::all()` in {}", config.migrations_dir.join("mod.rs").display());

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_make_migration_from_model() {
        let root = tempfile::tempdir().unwrap();
        let config = MigrationConfig {
            migrations_dir: root.path().join("migrations"),
            models_dir: root.path().join("models"),
            ..Default::default()
        };
        fs::create_dir_all(&config.models_dir).unwrap();
        fs::write(
            config.models_dir.join("post.rs"),
            "pub struct Post {\n    pub id: i64,\n    pub title: String,\n}\n",
        )
        .unwrap();

        let created = migration(&config, "create_posts_table", Some("Post")).unwrap();
        assert!(created.signature.ends_with("_create_posts_table"));

        let source = fs::read_to_string(&created.path).unwrap();
        assert!(source.contains("table.id();"));
        assert!(source.contains("table.text(\"title\");"));
        assert!(config.migrations_dir.join("mod.rs").is_file());
    }

    #[test]
    fn test_make_migration_unknown_model() {
        let root = tempfile::tempdir().unwrap();
        let config = MigrationConfig {
            migrations_dir: root.path().join("migrations"),
            models_dir: root.path().join("models"),
            ..Default::default()
        };
        fs::create_dir_all(&config.models_dir).unwrap();

        assert!(migration(&config, "create_posts_table", Some("Post")).is_err());
    }
}
