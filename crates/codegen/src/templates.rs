//! Migration stubs
//!
//! Three stubs render a `Migration` implementation: `create` for a new table,
//! `update` for altering an existing one and `blank` when no table could be
//! guessed from the name.

use tera::{Context, Tera};

use crate::error::CodegenResult;

pub static CREATE_STUB: &str = r#"use strata_migrations::{async_trait, Migration, MigrationResult, SchemaBuilder};

pub struct {{ class }};

#[async_trait]
impl Migration for {{ class }} {
    fn signature(&self) -> &str {
        "{{ signature }}"
    }

    async fn up(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema
            .create("{{ table }}", |table| {
{{ columns }}
            })
            .await
    }

    async fn down(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema.drop_if_exists("{{ table }}").await
    }
}
"#;

pub static UPDATE_STUB: &str = r#"use strata_migrations::{async_trait, Migration, MigrationResult, SchemaBuilder};

pub struct {{ class }};

#[async_trait]
impl Migration for {{ class }} {
    fn signature(&self) -> &str {
        "{{ signature }}"
    }

    async fn up(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema
            .table("{{ table }}", |table| {
{{ columns }}
            })
            .await
    }

    async fn down(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        schema
            .table("{{ table }}", |table| {
                let _ = table;
            })
            .await
    }
}
"#;

pub static BLANK_STUB: &str = r#"use strata_migrations::{async_trait, Migration, MigrationResult, SchemaBuilder};

pub struct {{ class }};

#[async_trait]
impl Migration for {{ class }} {
    fn signature(&self) -> &str {
        "{{ signature }}"
    }

    async fn up(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        let _ = schema;
        Ok(())
    }

    async fn down(&self, schema: &mut SchemaBuilder<'_>) -> MigrationResult<()> {
        let _ = schema;
        Ok(())
    }
}
"#;

/// Which stub a migration is rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    Create,
    Update,
    Blank,
}

impl StubKind {
    fn template_name(&self) -> &'static str {
        match self {
            StubKind::Create => "create.rs.stub",
            StubKind::Update => "update.rs.stub",
            StubKind::Blank => "blank.rs.stub",
        }
    }
}

/// Values substituted into a stub
#[derive(Debug, Clone, Default)]
pub struct StubContext {
    pub class: String,
    pub signature: String,
    pub table: String,
    /// Blueprint lines for the callback body, unindented
    pub lines: Vec<String>,
}

pub struct MigrationStubs {
    tera: Tera,
}

impl MigrationStubs {
    pub fn new() -> CodegenResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (StubKind::Create.template_name(), CREATE_STUB),
            (StubKind::Update.template_name(), UPDATE_STUB),
            (StubKind::Blank.template_name(), BLANK_STUB),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(&self, kind: StubKind, stub: &StubContext) -> CodegenResult<String> {
        let mut context = Context::new();
        context.insert("class", &stub.class);
        context.insert("signature", &stub.signature);
        context.insert("table", &stub.table);
        context.insert("columns", &indent(&stub.lines, 16));

        Ok(self.tera.render(kind.template_name(), &context)?)
    }
}

/// Indent non-blank lines; a callback with no lines gets a placeholder
fn indent(lines: &[String], width: usize) -> String {
    let pad = " ".repeat(width);
    if lines.is_empty() {
        return format!("{}let _ = table;", pad);
    }
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(lines: &[&str]) -> StubContext {
        StubContext {
            class: "CreateUsersTable".to_string(),
            signature: "20240101120000_create_users_table".to_string(),
            table: "users".to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_render_create_stub() {
        let stubs = MigrationStubs::new().unwrap();
        let source = stubs
            .render(StubKind::Create, &context(&["table.id();", "", "table.index(&[\"email\"]).name(\"idx\");"]))
            .unwrap();

        assert!(source.contains("pub struct CreateUsersTable;"));
        assert!(source.contains("\"20240101120000_create_users_table\""));
        assert!(source.contains(".create(\"users\", |table| {\n                table.id();\n\n                table.index(&[\"email\"]).name(\"idx\");\n"));
        assert!(source.contains("schema.drop_if_exists(\"users\").await"));
    }

    #[test]
    fn test_render_update_and_blank_stubs() {
        let stubs = MigrationStubs::new().unwrap();

        let update = stubs.render(StubKind::Update, &context(&[])).unwrap();
        assert!(update.contains(".table(\"users\", |table| {\n                let _ = table;"));

        let blank = stubs.render(StubKind::Blank, &context(&[])).unwrap();
        assert!(blank.contains("Ok(())"));
        assert!(!blank.contains("users\""));
    }
}
