//! SQLite grammar
//!
//! SQLite cannot add keys to an existing table, so primary and foreign keys
//! are written inline by `compile_create` and their own commands emit nothing.
//! Column changes and comments are unsupported.

use std::collections::HashMap;

use super::{
    default_value_sql, foreign_key_clause, quoted_list, type_table, Grammar, Modifier, TypeCompiler,
};
use crate::backends::SqlDialect;
use crate::error::MigrationResult;
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, CommandKind};

pub struct SqliteGrammar {
    modifiers: Vec<Modifier>,
    types: HashMap<ColumnType, TypeCompiler>,
}

impl SqliteGrammar {
    pub fn new() -> Self {
        Self {
            modifiers: vec![modify_nullable, modify_default, modify_increment],
            types: type_table(&[
                (ColumnType::BigInteger, type_integer),
                (ColumnType::Integer, type_integer),
                (ColumnType::MediumInteger, type_integer),
                (ColumnType::SmallInteger, type_integer),
                (ColumnType::TinyInteger, type_integer),
                (ColumnType::String, type_varchar),
                (ColumnType::Char, type_varchar),
                (ColumnType::Text, type_text),
                (ColumnType::TinyText, type_text),
                (ColumnType::MediumText, type_text),
                (ColumnType::LongText, type_text),
                (ColumnType::Json, type_text),
                (ColumnType::Jsonb, type_text),
                (ColumnType::Boolean, type_boolean),
                (ColumnType::Decimal, type_numeric),
                (ColumnType::Double, type_double),
                (ColumnType::Float, type_float),
                (ColumnType::Date, type_date),
                (ColumnType::DateTime, type_datetime),
                (ColumnType::DateTimeTz, type_datetime),
                (ColumnType::Timestamp, type_datetime),
                (ColumnType::TimestampTz, type_datetime),
                (ColumnType::Time, type_time),
                (ColumnType::TimeTz, type_time),
                (ColumnType::Uuid, type_varchar),
                (ColumnType::Binary, type_blob),
                (ColumnType::Enum, type_enum),
            ]),
        }
    }
}

impl Default for SqliteGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for SqliteGrammar {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }

    fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    fn attribute_commands(&self) -> &[CommandKind] {
        &[]
    }

    fn type_compilers(&self) -> &HashMap<ColumnType, TypeCompiler> {
        &self.types
    }

    fn compile_create(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        let mut parts = self.compile_columns(blueprint, &blueprint.added_columns())?;

        if let Some(primary) = blueprint.commands_of(CommandKind::Primary).first() {
            parts.push(format!("primary key ({})", primary.columns.join(", ")));
        }
        for foreign in blueprint.commands_of(CommandKind::Foreign) {
            parts.push(foreign_key_clause(blueprint, foreign));
        }

        Ok(vec![format!(
            "create table {} ({})",
            blueprint.table_name(),
            parts.join(", ")
        )])
    }

    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> Vec<String> {
        vec![format!("drop table if exists {}", blueprint.table_name())]
    }

    fn compile_add(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        Ok(self
            .compile_columns(blueprint, &blueprint.added_columns())?
            .into_iter()
            .map(|column| format!("alter table {} add column {}", blueprint.table_name(), column))
            .collect())
    }

    fn compile_rename(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} rename to {}{}",
            blueprint.table_name(),
            blueprint.prefix(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        command
            .columns
            .iter()
            .map(|column| format!("alter table {} drop column {}", blueprint.table_name(), column))
            .collect()
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} rename column {} to {}",
            blueprint.table_name(),
            command.from.as_deref().unwrap_or_default(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "create unique index {} on {} ({})",
            command.index_name(),
            blueprint.table_name(),
            command.columns.join(", ")
        )]
    }

    fn compile_index(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "create index {} on {} ({})",
            command.index_name(),
            blueprint.table_name(),
            command.columns.join(", ")
        )]
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        self.compile_drop_index(blueprint, command)
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!("drop index {}", command.index_name())]
    }

    fn compile_drop_all_tables(&self, tables: &[String]) -> Vec<String> {
        if tables.is_empty() {
            return Vec::new();
        }

        let mut statements = vec!["pragma foreign_keys = off".to_string()];
        statements.extend(tables.iter().map(|table| format!("drop table {}", table)));
        statements.push("pragma foreign_keys = on".to_string());
        statements
    }
}

fn modify_nullable(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    match column.nullable {
        Some(true) => " null".to_string(),
        Some(false) => " not null".to_string(),
        None => String::new(),
    }
}

fn modify_default(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    match column.effective_default() {
        Some(value) => format!(" default {}", default_value_sql(&value)),
        None => String::new(),
    }
}

fn modify_increment(blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    if column.auto_increment
        && column.column_type.is_integer()
        && !blueprint.has_command(CommandKind::Primary)
    {
        return " primary key autoincrement".to_string();
    }
    String::new()
}

fn type_integer(_column: &ColumnDefinition) -> String {
    "integer".to_string()
}

fn type_varchar(_column: &ColumnDefinition) -> String {
    "varchar".to_string()
}

fn type_text(_column: &ColumnDefinition) -> String {
    "text".to_string()
}

fn type_boolean(_column: &ColumnDefinition) -> String {
    "tinyint(1)".to_string()
}

fn type_numeric(_column: &ColumnDefinition) -> String {
    "numeric".to_string()
}

fn type_double(_column: &ColumnDefinition) -> String {
    "double".to_string()
}

fn type_float(_column: &ColumnDefinition) -> String {
    "float".to_string()
}

fn type_date(_column: &ColumnDefinition) -> String {
    "date".to_string()
}

fn type_datetime(_column: &ColumnDefinition) -> String {
    "datetime".to_string()
}

fn type_time(_column: &ColumnDefinition) -> String {
    "time".to_string()
}

fn type_blob(_column: &ColumnDefinition) -> String {
    "blob".to_string()
}

fn type_enum(column: &ColumnDefinition) -> String {
    format!(
        "varchar check ({} in ({}))",
        column.name,
        quoted_list(&column.allowed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_inlines_keys() {
        let mut blueprint = Blueprint::new("posts", "");
        blueprint.create();
        blueprint.integer("id");
        blueprint.integer("user_id").not_null();
        blueprint.string("title", None).default("untitled");
        blueprint.primary(&["id"]);
        blueprint.foreign(&["user_id"]).references(&["id"]).on("users").cascade_on_delete();

        assert_eq!(
            blueprint.to_sql(&SqliteGrammar::new()).unwrap(),
            vec![
                "create table posts (id integer, user_id integer not null, \
                 title varchar default 'untitled', primary key (id), \
                 foreign key (user_id) references users (id) on delete cascade)"
            ]
        );
    }

    #[test]
    fn test_auto_increment_id() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.id();

        assert_eq!(
            blueprint.to_sql(&SqliteGrammar::new()).unwrap(),
            vec!["create table users (id integer primary key autoincrement)"]
        );
    }

    #[test]
    fn test_one_statement_per_added_and_dropped_column() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.string("a", None);
        blueprint.text("b").nullable();
        blueprint.integer("c").change().comment("ignored");
        blueprint.drop_column(&["x", "y"]);

        assert_eq!(
            blueprint.to_sql(&SqliteGrammar::new()).unwrap(),
            vec![
                "alter table users add column a varchar",
                "alter table users add column b text null",
                "alter table users drop column x",
                "alter table users drop column y",
            ]
        );
    }

    #[test]
    fn test_indexes() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.unique(&["email"]);
        blueprint.index(&["name"]);
        blueprint.drop_index(&["name"]);

        assert_eq!(
            blueprint.to_sql(&SqliteGrammar::new()).unwrap(),
            vec![
                "create unique index users_email_unique on users (email)",
                "create index users_name_index on users (name)",
                "drop index users_name_index",
            ]
        );
    }

    #[test]
    fn test_drop_all_tables_toggles_foreign_keys() {
        let tables = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            SqliteGrammar::new().compile_drop_all_tables(&tables),
            vec![
                "pragma foreign_keys = off",
                "drop table a",
                "drop table b",
                "pragma foreign_keys = on",
            ]
        );
    }
}
