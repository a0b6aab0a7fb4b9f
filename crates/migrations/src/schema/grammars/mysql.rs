//! MySQL grammar

use std::collections::HashMap;

use super::{
    default_value_sql, foreign_key_clause, quote_string, quoted_list, type_table, Grammar, Modifier,
    TypeCompiler,
};
use crate::backends::SqlDialect;
use crate::error::MigrationResult;
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, CommandKind};

pub struct MySqlGrammar {
    modifiers: Vec<Modifier>,
    types: HashMap<ColumnType, TypeCompiler>,
}

impl MySqlGrammar {
    pub fn new() -> Self {
        Self {
            modifiers: vec![
                modify_unsigned,
                modify_nullable,
                modify_default,
                modify_increment,
                modify_comment,
            ],
            types: type_table(&[
                (ColumnType::BigInteger, |_: &ColumnDefinition| "bigint".to_string()),
                (ColumnType::Integer, |_: &ColumnDefinition| "int".to_string()),
                (ColumnType::MediumInteger, |_: &ColumnDefinition| "mediumint".to_string()),
                (ColumnType::SmallInteger, |_: &ColumnDefinition| "smallint".to_string()),
                (ColumnType::TinyInteger, |_: &ColumnDefinition| "tinyint".to_string()),
                (ColumnType::String, |c: &ColumnDefinition| format!("varchar({})", c.length.unwrap_or(255))),
                (ColumnType::Char, |c: &ColumnDefinition| format!("char({})", c.length.unwrap_or(255))),
                (ColumnType::Text, |_: &ColumnDefinition| "text".to_string()),
                (ColumnType::TinyText, |_: &ColumnDefinition| "tinytext".to_string()),
                (ColumnType::MediumText, |_: &ColumnDefinition| "mediumtext".to_string()),
                (ColumnType::LongText, |_: &ColumnDefinition| "longtext".to_string()),
                (ColumnType::Boolean, |_: &ColumnDefinition| "tinyint(1)".to_string()),
                (ColumnType::Decimal, |c: &ColumnDefinition| {
                    format!("decimal({}, {})", c.total.unwrap_or(8), c.places.unwrap_or(2))
                }),
                (ColumnType::Double, |_: &ColumnDefinition| "double".to_string()),
                (ColumnType::Float, |c: &ColumnDefinition| match c.precision {
                    Some(precision) => format!("float({})", precision),
                    None => "float".to_string(),
                }),
                (ColumnType::Date, |_: &ColumnDefinition| "date".to_string()),
                (ColumnType::DateTime, |c: &ColumnDefinition| with_precision("datetime", c)),
                (ColumnType::DateTimeTz, |c: &ColumnDefinition| with_precision("datetime", c)),
                (ColumnType::Timestamp, |c: &ColumnDefinition| with_precision("timestamp", c)),
                (ColumnType::TimestampTz, |c: &ColumnDefinition| with_precision("timestamp", c)),
                (ColumnType::Time, |c: &ColumnDefinition| with_precision("time", c)),
                (ColumnType::TimeTz, |c: &ColumnDefinition| with_precision("time", c)),
                (ColumnType::Json, |_: &ColumnDefinition| "json".to_string()),
                (ColumnType::Jsonb, |_: &ColumnDefinition| "json".to_string()),
                (ColumnType::Uuid, |_: &ColumnDefinition| "char(36)".to_string()),
                (ColumnType::Binary, |_: &ColumnDefinition| "blob".to_string()),
                (ColumnType::Enum, |c: &ColumnDefinition| format!("enum({})", quoted_list(&c.allowed))),
            ]),
        }
    }
}

impl Default for MySqlGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for MySqlGrammar {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::MySQL
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
        let columns = self.compile_columns(blueprint, &blueprint.added_columns())?;
        Ok(vec![format!(
            "create table {} ({})",
            blueprint.table_name(),
            columns.join(", ")
        )])
    }

    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> Vec<String> {
        vec![format!("drop table if exists {}", blueprint.table_name())]
    }

    fn compile_add(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        self.alter_columns(blueprint, &blueprint.added_columns(), "add")
    }

    fn compile_change(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        self.alter_columns(blueprint, &blueprint.changed_columns(), "modify")
    }

    fn compile_rename(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "rename table {} to {}{}",
            blueprint.table_name(),
            blueprint.prefix(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        let columns: Vec<String> = command
            .columns
            .iter()
            .map(|c| format!("drop column {}", c))
            .collect();
        vec![format!(
            "alter table {} {}",
            blueprint.table_name(),
            columns.join(", ")
        )]
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} rename column {} to {}",
            blueprint.table_name(),
            command.from.as_deref().unwrap_or_default(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_primary(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} add primary key {}({})",
            blueprint.table_name(),
            algorithm(command),
            command.columns.join(", ")
        )]
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        self.add_index(blueprint, command, "unique")
    }

    fn compile_index(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        self.add_index(blueprint, command, "index")
    }

    fn compile_foreign(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} add constraint {} {}",
            blueprint.table_name(),
            command.index_name(),
            foreign_key_clause(blueprint, command)
        )]
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, _command: &Command) -> Vec<String> {
        vec![format!("alter table {} drop primary key", blueprint.table_name())]
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        self.compile_drop_index(blueprint, command)
    }

    fn compile_drop_index(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} drop index {}",
            blueprint.table_name(),
            command.index_name()
        )]
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} drop foreign key {}",
            blueprint.table_name(),
            command.index_name()
        )]
    }

    fn compile_rename_index(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} rename index {} to {}",
            blueprint.table_name(),
            command.from.as_deref().unwrap_or_default(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_drop_all_tables(&self, tables: &[String]) -> Vec<String> {
        if tables.is_empty() {
            return Vec::new();
        }
        vec![
            "set foreign_key_checks = 0".to_string(),
            format!("drop table {}", tables.join(", ")),
            "set foreign_key_checks = 1".to_string(),
        ]
    }
}

impl MySqlGrammar {
    fn alter_columns(
        &self,
        blueprint: &Blueprint,
        columns: &[&ColumnDefinition],
        keyword: &str,
    ) -> MigrationResult<Vec<String>> {
        let columns = self.compile_columns(blueprint, columns)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let clauses: Vec<String> = columns
            .into_iter()
            .map(|c| format!("{} {}", keyword, c))
            .collect();
        Ok(vec![format!(
            "alter table {} {}",
            blueprint.table_name(),
            clauses.join(", ")
        )])
    }

    fn add_index(&self, blueprint: &Blueprint, command: &Command, kind: &str) -> Vec<String> {
        vec![format!(
            "alter table {} add {} {}{}({})",
            blueprint.table_name(),
            kind,
            command.index_name(),
            algorithm(command),
            command.columns.join(", ")
        )]
    }
}

/// ` using <algorithm> ` or a single space
fn algorithm(command: &Command) -> String {
    match &command.algorithm {
        Some(algorithm) => format!(" using {} ", algorithm),
        None => " ".to_string(),
    }
}

fn with_precision(base: &str, column: &ColumnDefinition) -> String {
    match column.precision {
        Some(precision) => format!("{}({})", base, precision),
        None => base.to_string(),
    }
}

fn modify_unsigned(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    if column.unsigned {
        return " unsigned".to_string();
    }
    String::new()
}

fn modify_nullable(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    match column.nullable {
        Some(true) => " null".to_string(),
        Some(false) => " not null".to_string(),
        None => String::new(),
    }
}

fn modify_default(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    let mut sql = match column.effective_default() {
        Some(value) => format!(" default {}", default_value_sql(&value)),
        None => String::new(),
    };
    if column.use_current_on_update {
        sql.push_str(" on update CURRENT_TIMESTAMP");
    }
    sql
}

fn modify_increment(blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    if !column.auto_increment || !column.column_type.is_integer() {
        return String::new();
    }
    if column.change || blueprint.has_command(CommandKind::Primary) {
        return " auto_increment".to_string();
    }
    " auto_increment primary key".to_string()
}

fn modify_comment(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    match &column.comment {
        Some(comment) => format!(" comment {}", quote_string(comment)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.id();
        blueprint.string("name", None).comment("full name");
        blueprint.boolean("admin").default(false).not_null();
        blueprint.timestamp("updated_at").use_current().use_current_on_update();

        assert_eq!(
            blueprint.to_sql(&MySqlGrammar::new()).unwrap(),
            vec![
                "create table users (id bigint unsigned auto_increment primary key, \
                 name varchar(255) comment 'full name', \
                 admin tinyint(1) not null default '0', \
                 updated_at timestamp default CURRENT_TIMESTAMP on update CURRENT_TIMESTAMP)"
            ]
        );
    }

    #[test]
    fn test_add_and_modify() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.integer("age").unsigned().nullable();
        blueprint.string("name", Some(100)).change();

        assert_eq!(
            blueprint.to_sql(&MySqlGrammar::new()).unwrap(),
            vec![
                "alter table users add age int unsigned null",
                "alter table users modify name varchar(100)",
            ]
        );
    }

    #[test]
    fn test_indexes_and_keys() {
        let mut blueprint = Blueprint::new("posts", "");
        blueprint.unique(&["slug"]);
        blueprint.index(&["author_id", "created_at"]).name("by_author");
        blueprint.foreign(&["author_id"]).references(&["id"]).on("users").restrict_on_delete();
        blueprint.drop_primary();
        blueprint.drop_foreign(&["author_id"]);
        blueprint.drop_unique(&["slug"]);
        blueprint.rename("articles");

        assert_eq!(
            blueprint.to_sql(&MySqlGrammar::new()).unwrap(),
            vec![
                "alter table posts add unique posts_slug_unique (slug)",
                "alter table posts add index by_author (author_id, created_at)",
                "alter table posts add constraint posts_author_id_foreign foreign key (author_id) \
                 references users (id) on delete restrict",
                "alter table posts drop primary key",
                "alter table posts drop foreign key posts_author_id_foreign",
                "alter table posts drop index posts_slug_unique",
                "rename table posts to articles",
            ]
        );
    }

    #[test]
    fn test_enum_and_drop_all() {
        let mut blueprint = Blueprint::new("t", "");
        blueprint.create();
        blueprint.enum_column("state", &["on", "off"]);
        assert_eq!(
            blueprint.to_sql(&MySqlGrammar::new()).unwrap(),
            vec!["create table t (state enum('on', 'off'))"]
        );

        assert_eq!(
            MySqlGrammar::new().compile_drop_all_tables(&["a".to_string()]),
            vec![
                "set foreign_key_checks = 0",
                "drop table a",
                "set foreign_key_checks = 1",
            ]
        );
    }
}
