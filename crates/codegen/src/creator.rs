//! Migration Creator - scaffolds migration files
//!
//! A new migration is written to `<dir>/<YYYYMMDDHHMMSS>_<name>.rs`; the file
//! stem is the migration's signature. After every write the directory's
//! `mod.rs` is regenerated so the application can register all migrations
//! with `migrations::all()`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::error::{CodegenError, CodegenResult};
use crate::guesser::{TableGuess, TableGuesser};
use crate::inflection::{to_pascal_case, to_snake_case};
use crate::mapper::GeneratedSchema;
use crate::templates::{MigrationStubs, StubContext, StubKind};
use crate::writer::CodeWriter;

const SIGNATURE_FORMAT: &str = "%Y%m%d%H%M%S";
const INDEX_FILE: &str = "mod.rs";

/// A scaffolded migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMigration {
    pub signature: String,
    pub path: PathBuf,
    pub table: Option<TableGuess>,
}

pub struct MigrationCreator {
    migrations_dir: PathBuf,
    stubs: MigrationStubs,
    guesser: TableGuesser,
    writer: CodeWriter,
}

impl MigrationCreator {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> CodegenResult<Self> {
        Ok(Self {
            migrations_dir: migrations_dir.into(),
            stubs: MigrationStubs::new()?,
            guesser: TableGuesser::new()?,
            writer: CodeWriter::new(),
        })
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Scaffold a migration stamped with the current local time
    pub fn create(&self, name: &str, schema: Option<&GeneratedSchema>) -> CodegenResult<CreatedMigration> {
        self.create_at(name, schema, Local::now().naive_local())
    }

    /// Scaffold a migration stamped with `timestamp`.
    ///
    /// With a generated schema the migration always creates the model's
    /// table; otherwise the table and intent are guessed from `name`.
    pub fn create_at(
        &self,
        name: &str,
        schema: Option<&GeneratedSchema>,
        timestamp: NaiveDateTime,
    ) -> CodegenResult<CreatedMigration> {
        let name = normalize_name(name)?;
        let signature = format!("{}_{}", timestamp.format(SIGNATURE_FORMAT), name);

        let (kind, table, lines) = match schema {
            Some(schema) => (
                StubKind::Create,
                Some(TableGuess {
                    table: schema.table.clone(),
                    create: true,
                }),
                schema.lines.clone(),
            ),
            None => match self.guesser.guess(&name) {
                Some(guess) if guess.create => (StubKind::Create, Some(guess), vec!["table.id();".to_string()]),
                Some(guess) => (StubKind::Update, Some(guess), Vec::new()),
                None => (StubKind::Blank, None, Vec::new()),
            },
        };

        let content = self.stubs.render(
            kind,
            &StubContext {
                class: to_pascal_case(&name),
                signature: signature.clone(),
                table: table.as_ref().map(|t| t.table.clone()).unwrap_or_default(),
                lines,
            },
        )?;

        let path = self.migrations_dir.join(format!("{}.rs", signature));
        self.writer.write_new(&path, &content)?;
        info!("Created Migration: {}", signature);

        self.write_index()?;

        Ok(CreatedMigration {
            signature,
            path,
            table,
        })
    }

    /// Regenerate `mod.rs` listing every migration file in the directory
    pub fn write_index(&self) -> CodegenResult<bool> {
        let signatures = self.signatures()?;

        let mut content = String::from(
            "// Generated by `strata make:migration`. Do not edit.\n\nuse strata_migrations::Migration;\n",
        );
        for signature in &signatures {
            content.push_str(&format!(
                "\n#[path = \"{}.rs\"]\nmod m{};\n",
                signature, signature
            ));
        }

        content.push_str("\npub fn all() -> Vec<Box<dyn Migration>> {\n    vec![\n");
        for signature in &signatures {
            content.push_str(&format!(
                "        Box::new(m{}::{}),\n",
                signature,
                to_pascal_case(description(signature))
            ));
        }
        content.push_str("    ]\n}\n");

        self.writer
            .write_if_changed(&self.migrations_dir.join(INDEX_FILE), &content)
    }

    /// Signatures of the migration files on disk, oldest first
    pub fn signatures(&self) -> CodegenResult<Vec<String>> {
        let mut signatures = Vec::new();
        if !self.migrations_dir.is_dir() {
            return Ok(signatures);
        }

        for entry in fs::read_dir(&self.migrations_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "rs") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_signature(stem) {
                    signatures.push(stem.to_string());
                }
            }
        }
        signatures.sort();
        Ok(signatures)
    }
}

/// `CreateUsersTable` / `create users table` → `create_users_table`
fn normalize_name(name: &str) -> CodegenResult<String> {
    let normalized = to_snake_case(name.trim());
    let valid = !normalized.is_empty()
        && normalized.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && normalized.starts_with(|c: char| c.is_ascii_lowercase());
    if valid {
        Ok(normalized)
    } else {
        Err(CodegenError::InvalidName(name.to_string()))
    }
}

fn is_signature(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    bytes.len() > 15 && bytes[..14].iter().all(u8::is_ascii_digit) && bytes[14] == b'_'
}

fn description(signature: &str) -> &str {
    signature.get(15..).unwrap_or(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_create_guesses_table() {
        let dir = tempfile::tempdir().unwrap();
        let creator = MigrationCreator::new(dir.path()).unwrap();

        let created = creator.create_at("CreateUsersTable", None, timestamp()).unwrap();
        assert_eq!(created.signature, "20240309140507_create_users_table");
        assert_eq!(created.path, dir.path().join("20240309140507_create_users_table.rs"));
        assert_eq!(
            created.table,
            Some(TableGuess { table: "users".to_string(), create: true })
        );

        let source = fs::read_to_string(&created.path).unwrap();
        assert!(source.contains("pub struct CreateUsersTable;"));
        assert!(source.contains(".create(\"users\""));
        assert!(source.contains("table.id();"));
    }

    #[test]
    fn test_create_from_generated_schema() {
        let dir = tempfile::tempdir().unwrap();
        let creator = MigrationCreator::new(dir.path()).unwrap();
        let schema = GeneratedSchema {
            table: "posts".to_string(),
            lines: vec!["table.id();".to_string(), "table.text(\"body\");".to_string()],
        };

        let created = creator.create_at("create_posts", Some(&schema), timestamp()).unwrap();
        let source = fs::read_to_string(&created.path).unwrap();
        assert!(source.contains("table.text(\"body\");"));
    }

    #[test]
    fn test_update_and_blank_stubs() {
        let dir = tempfile::tempdir().unwrap();
        let creator = MigrationCreator::new(dir.path()).unwrap();

        let update = creator.create_at("add_votes_to_users_table", None, timestamp()).unwrap();
        assert!(fs::read_to_string(&update.path).unwrap().contains(".table(\"users\""));

        let blank = creator.create_at("backfill_slugs", None, timestamp()).unwrap();
        assert_eq!(blank.table, None);
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let creator = MigrationCreator::new(dir.path()).unwrap();

        creator.create_at("create_users_table", None, timestamp()).unwrap();
        let err = creator.create_at("create_users_table", None, timestamp()).unwrap_err();
        assert!(matches!(err, CodegenError::FileExists(_)));

        for name in ["", "9lives", "drop;users"] {
            let err = creator.create_at(name, None, timestamp()).unwrap_err();
            assert!(matches!(err, CodegenError::InvalidName(_)), "{:?} should be rejected", name);
        }
    }

    #[test]
    fn test_index_lists_migrations_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let creator = MigrationCreator::new(dir.path()).unwrap();

        let later = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();
        creator.create_at("add_votes_to_users_table", None, later).unwrap();
        creator.create_at("create_users_table", None, timestamp()).unwrap();
        fs::write(dir.path().join("helpers.rs"), "").unwrap();

        assert_eq!(
            creator.signatures().unwrap(),
            vec![
                "20240309140507_create_users_table",
                "20240310090000_add_votes_to_users_table",
            ]
        );

        let index = fs::read_to_string(dir.path().join("mod.rs")).unwrap();
        assert!(index.contains("#[path = \"20240309140507_create_users_table.rs\"]\nmod m20240309140507_create_users_table;"));
        let first = index.find("Box::new(m20240309140507_create_users_table::CreateUsersTable)").unwrap();
        let second = index.find("Box::new(m20240310090000_add_votes_to_users_table::AddVotesToUsersTable)").unwrap();
        assert!(first < second);
        assert!(!creator.write_index().unwrap());
    }
}
