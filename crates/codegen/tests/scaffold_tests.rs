use std::fs;

use chrono::NaiveDate;
use strata_codegen::{generate, MigrationCreator, ModelDescriptor};

const USER_MODEL: &str = r#"
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub base: Model,
    #[schema("size:120;uniqueIndex:users_email_unique")]
    pub email: String,
    pub name: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub posts: HasMany<Post>,
    pub trash: SoftDeletes,
}
"#;

#[test]
fn test_model_to_migration_file() {
    let models = tempfile::tempdir().unwrap();
    let migrations = tempfile::tempdir().unwrap();
    fs::write(models.path().join("user.rs"), USER_MODEL).unwrap();

    let model = ModelDescriptor::load(models.path(), "User").unwrap();
    let schema = generate(&model).unwrap();
    assert_eq!(schema.table, "users");
    assert_eq!(
        schema.lines,
        vec![
            "table.id();",
            "table.string(\"email\", Some(120));",
            "table.text(\"name\");",
            "table.timestamp_tz(\"last_login_at\").nullable();",
            "table.timestamps();",
            "table.soft_deletes();",
            "",
            "table.unique(&[\"email\"]).name(\"users_email_unique\");",
        ]
    );

    let creator = MigrationCreator::new(migrations.path()).unwrap();
    let timestamp = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    let created = creator.create_at("create_users_table", Some(&schema), timestamp).unwrap();

    assert_eq!(created.signature, "20240102030405_create_users_table");
    let source = fs::read_to_string(&created.path).unwrap();
    assert!(source.contains("impl Migration for CreateUsersTable"));
    assert!(source.contains("                table.soft_deletes();\n\n                table.unique("));
    assert!(source.contains("schema.drop_if_exists(\"users\").await"));

    let index = fs::read_to_string(migrations.path().join("mod.rs")).unwrap();
    assert!(index.contains("Box::new(m20240102030405_create_users_table::CreateUsersTable)"));
}
