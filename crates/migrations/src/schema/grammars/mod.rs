//! Dialect grammars
//!
//! A [`Grammar`] turns a [`Blueprint`] and its commands into SQL for one
//! database dialect. Grammars are stateless apart from the modifier list,
//! attribute-command list and type table they build at construction.

use std::collections::HashMap;

use super::blueprint::Blueprint;
use super::column::{ColumnDefinition, ColumnType, DefaultValue};
use super::command::{Command, CommandKind};
use crate::backends::SqlDialect;
use crate::error::{MigrationError, MigrationResult};

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;

/// Column modifier: returns a SQL fragment (with leading space) or an empty
/// string when the modifier does not apply
pub type Modifier = fn(&Blueprint, &ColumnDefinition) -> String;

/// Compiles one column's SQL type
pub type TypeCompiler = fn(&ColumnDefinition) -> String;

/// SQL compiler for one dialect.
///
/// Every `compile_*` hook not overridden by a dialect emits no statement.
pub trait Grammar: Send + Sync {
    fn dialect(&self) -> SqlDialect;

    /// Column modifiers, applied in order
    fn modifiers(&self) -> &[Modifier];

    /// Column attributes compiled as separate commands after the others
    fn attribute_commands(&self) -> &[CommandKind];

    /// Type tag to compiler table
    fn type_compilers(&self) -> &HashMap<ColumnType, TypeCompiler>;

    /// Resolve a column's SQL type through the type table
    fn column_type(&self, column: &ColumnDefinition) -> MigrationResult<String> {
        self.type_compilers()
            .get(&column.column_type)
            .map(|compile| compile(column))
            .ok_or_else(|| MigrationError::UnsupportedColumnType {
                column: column.name.clone(),
                column_type: column.column_type.to_string(),
                dialect: self.dialect().to_string(),
            })
    }

    /// `<name> <type><modifiers>`
    fn compile_column(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> MigrationResult<String> {
        let mut sql = format!("{} {}", column.name, self.column_type(column)?);
        for modifier in self.modifiers() {
            sql.push_str(&modifier(blueprint, column));
        }
        Ok(sql)
    }

    fn compile_columns(
        &self,
        blueprint: &Blueprint,
        columns: &[&ColumnDefinition],
    ) -> MigrationResult<Vec<String>> {
        columns
            .iter()
            .map(|column| self.compile_column(blueprint, column))
            .collect()
    }

    /// Dispatch one command to its compiler
    fn compile_command(&self, blueprint: &Blueprint, command: &Command) -> MigrationResult<Vec<String>> {
        let statements = match command.kind {
            CommandKind::Create => return self.compile_create(blueprint),
            CommandKind::Add => return self.compile_add(blueprint),
            CommandKind::Change => return self.compile_change(blueprint),
            CommandKind::Drop => self.compile_drop(blueprint),
            CommandKind::DropIfExists => self.compile_drop_if_exists(blueprint),
            CommandKind::Rename => self.compile_rename(blueprint, command),
            CommandKind::DropColumn => self.compile_drop_column(blueprint, command),
            CommandKind::RenameColumn => self.compile_rename_column(blueprint, command),
            CommandKind::Comment => self.compile_comment(blueprint, command),
            CommandKind::Primary => self.compile_primary(blueprint, command),
            CommandKind::Unique => self.compile_unique(blueprint, command),
            CommandKind::Index => self.compile_index(blueprint, command),
            CommandKind::Foreign => self.compile_foreign(blueprint, command),
            CommandKind::DropPrimary => self.compile_drop_primary(blueprint, command),
            CommandKind::DropUnique => self.compile_drop_unique(blueprint, command),
            CommandKind::DropIndex => self.compile_drop_index(blueprint, command),
            CommandKind::DropForeign => self.compile_drop_foreign(blueprint, command),
            CommandKind::RenameIndex => self.compile_rename_index(blueprint, command),
        };
        Ok(statements)
    }

    fn compile_create(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>>;

    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> Vec<String>;

    fn compile_drop(&self, blueprint: &Blueprint) -> Vec<String> {
        vec![format!("drop table {}", blueprint.table_name())]
    }

    fn compile_add(&self, _blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn compile_change(&self, _blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn compile_rename(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_drop_column(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_rename_column(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_comment(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_primary(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_unique(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_index(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_foreign(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_drop_primary(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_drop_unique(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_drop_foreign(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    fn compile_rename_index(&self, _blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        Vec::new()
    }

    /// Statements dropping every given table
    fn compile_drop_all_tables(&self, tables: &[String]) -> Vec<String>;
}

/// Build a type table from `(tag, compiler)` pairs
pub(crate) fn type_table(entries: &[(ColumnType, TypeCompiler)]) -> HashMap<ColumnType, TypeCompiler> {
    entries.iter().copied().collect()
}

/// Single-quote a string literal, doubling embedded quotes
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL literal for a column default
pub fn default_value_sql(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Bool(true) => "'1'".to_string(),
        DefaultValue::Bool(false) => "'0'".to_string(),
        DefaultValue::Integer(i) => quote_string(&i.to_string()),
        DefaultValue::Float(f) => quote_string(&f.to_string()),
        DefaultValue::String(s) => quote_string(s),
        DefaultValue::Expression(sql) => sql.clone(),
    }
}

/// `'a', 'b'` list of quoted values
pub(crate) fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| quote_string(value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Foreign key clause shared by the dialects:
/// `foreign key (a) references <prefix>t (b)[ on delete x][ on update y]`
pub(crate) fn foreign_key_clause(blueprint: &Blueprint, command: &Command) -> String {
    let mut sql = format!(
        "foreign key ({}) references {}{} ({})",
        command.columns.join(", "),
        blueprint.prefix(),
        command.on.as_deref().unwrap_or_default(),
        command.references.join(", ")
    );
    if let Some(action) = &command.on_delete {
        sql.push_str(&format!(" on delete {}", action));
    }
    if let Some(action) = &command.on_update {
        sql.push_str(&format!(" on update {}", action));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_string_escapes_quotes() {
        assert_eq!(quote_string("it's"), "'it''s'");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value_sql(&DefaultValue::Bool(true)), "'1'");
        assert_eq!(default_value_sql(&DefaultValue::Integer(0)), "'0'");
        assert_eq!(default_value_sql(&DefaultValue::from("draft")), "'draft'");
        assert_eq!(
            default_value_sql(&DefaultValue::expression("CURRENT_TIMESTAMP")),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_unsupported_type_is_configuration_error() {
        struct EmptyGrammar {
            types: HashMap<ColumnType, TypeCompiler>,
        }

        impl Grammar for EmptyGrammar {
            fn dialect(&self) -> SqlDialect {
                SqlDialect::SQLite
            }
            fn modifiers(&self) -> &[Modifier] {
                &[]
            }
            fn attribute_commands(&self) -> &[CommandKind] {
                &[]
            }
            fn type_compilers(&self) -> &HashMap<ColumnType, TypeCompiler> {
                &self.types
            }
            fn compile_create(&self, _blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
                Ok(Vec::new())
            }
            fn compile_drop_if_exists(&self, _blueprint: &Blueprint) -> Vec<String> {
                Vec::new()
            }
            fn compile_drop_all_tables(&self, _tables: &[String]) -> Vec<String> {
                Vec::new()
            }
        }

        let grammar = EmptyGrammar { types: HashMap::new() };
        let column = ColumnDefinition::new("payload", ColumnType::Jsonb);
        let err = grammar.column_type(&column).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("jsonb"));

        let blueprint = Blueprint::new("events", "");
        let command = Command::new(CommandKind::RenameIndex).with_rename("a", "b");
        assert!(grammar.compile_command(&blueprint, &command).unwrap().is_empty());
    }
}
