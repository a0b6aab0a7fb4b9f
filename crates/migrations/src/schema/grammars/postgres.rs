//! PostgreSQL grammar

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

pub struct PostgresGrammar {
    modifiers: Vec<Modifier>,
    attribute_commands: Vec<CommandKind>,
    types: HashMap<ColumnType, TypeCompiler>,
}

impl PostgresGrammar {
    pub fn new() -> Self {
        Self {
            modifiers: vec![modify_default, modify_increment, modify_nullable],
            attribute_commands: vec![CommandKind::Comment],
            types: type_table(&[
                (ColumnType::BigInteger, type_big_integer),
                (ColumnType::Integer, type_integer),
                (ColumnType::MediumInteger, type_integer),
                (ColumnType::SmallInteger, type_small_integer),
                (ColumnType::TinyInteger, type_small_integer),
                (ColumnType::String, type_string),
                (ColumnType::Char, type_char),
                (ColumnType::Text, type_text),
                (ColumnType::TinyText, type_text),
                (ColumnType::MediumText, type_text),
                (ColumnType::LongText, type_text),
                (ColumnType::Boolean, |_: &ColumnDefinition| "boolean".to_string()),
                (ColumnType::Decimal, type_decimal),
                (ColumnType::Double, |_: &ColumnDefinition| "double precision".to_string()),
                (ColumnType::Float, type_float),
                (ColumnType::Date, |_: &ColumnDefinition| "date".to_string()),
                (ColumnType::DateTime, type_timestamp),
                (ColumnType::DateTimeTz, type_timestamp_tz),
                (ColumnType::Timestamp, type_timestamp),
                (ColumnType::TimestampTz, type_timestamp_tz),
                (ColumnType::Time, type_time),
                (ColumnType::TimeTz, type_time_tz),
                (ColumnType::Json, |_: &ColumnDefinition| "json".to_string()),
                (ColumnType::Jsonb, |_: &ColumnDefinition| "jsonb".to_string()),
                (ColumnType::Uuid, |_: &ColumnDefinition| "uuid".to_string()),
                (ColumnType::Binary, |_: &ColumnDefinition| "bytea".to_string()),
                (ColumnType::Enum, type_enum),
            ]),
        }
    }
}

impl Default for PostgresGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar for PostgresGrammar {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSQL
    }

    fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    fn attribute_commands(&self) -> &[CommandKind] {
        &self.attribute_commands
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
        let columns = self.compile_columns(blueprint, &blueprint.added_columns())?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let columns: Vec<String> = columns.into_iter().map(|c| format!("add column {}", c)).collect();
        Ok(vec![format!(
            "alter table {} {}",
            blueprint.table_name(),
            columns.join(", ")
        )])
    }

    fn compile_change(&self, blueprint: &Blueprint) -> MigrationResult<Vec<String>> {
        let mut clauses = Vec::new();
        for column in blueprint.changed_columns() {
            clauses.push(format!(
                "alter column {} type {}",
                column.name,
                self.column_type(column)?
            ));
            for modifier in self.modifiers() {
                let fragment = modifier(blueprint, column);
                if !fragment.is_empty() {
                    clauses.push(format!("alter column {}{}", column.name, fragment));
                }
            }
        }

        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![format!(
            "alter table {} {}",
            blueprint.table_name(),
            clauses.join(", ")
        )])
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

    fn compile_comment(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        let Some(column) = &command.column else {
            return Vec::new();
        };
        let comment = match &column.comment {
            Some(comment) => quote_string(comment),
            None => "NULL".to_string(),
        };
        vec![format!(
            "comment on column {}.{} is {}",
            blueprint.table_name(),
            column.name,
            comment
        )]
    }

    fn compile_primary(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} add primary key ({})",
            blueprint.table_name(),
            command.columns.join(", ")
        )]
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} add constraint {} unique ({})",
            blueprint.table_name(),
            command.index_name(),
            command.columns.join(", ")
        )]
    }

    fn compile_index(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        let algorithm = command
            .algorithm
            .as_ref()
            .map(|a| format!(" using {}", a))
            .unwrap_or_default();
        vec![format!(
            "create index {} on {}{} ({})",
            command.index_name(),
            blueprint.table_name(),
            algorithm,
            command.columns.join(", ")
        )]
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
        vec![format!(
            "alter table {} drop constraint {}_pkey",
            blueprint.table_name(),
            blueprint.table_name()
        )]
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter table {} drop constraint {}",
            blueprint.table_name(),
            command.index_name()
        )]
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!("drop index {}", command.index_name())]
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        self.compile_drop_unique(blueprint, command)
    }

    fn compile_rename_index(&self, _blueprint: &Blueprint, command: &Command) -> Vec<String> {
        vec![format!(
            "alter index {} rename to {}",
            command.from.as_deref().unwrap_or_default(),
            command.to.as_deref().unwrap_or_default()
        )]
    }

    fn compile_drop_all_tables(&self, tables: &[String]) -> Vec<String> {
        if tables.is_empty() {
            return Vec::new();
        }
        vec![format!("drop table {} cascade", tables.join(", "))]
    }
}

fn modify_default(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    let default = column.effective_default();
    if column.change {
        if column.auto_increment {
            return String::new();
        }
        return match default {
            Some(value) => format!(" set default {}", default_value_sql(&value)),
            None => " drop default".to_string(),
        };
    }

    match default {
        Some(value) => format!(" default {}", default_value_sql(&value)),
        None => String::new(),
    }
}

fn modify_increment(blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    if !column.change
        && !blueprint.has_command(CommandKind::Primary)
        && column.column_type.is_integer()
        && column.auto_increment
    {
        return " primary key".to_string();
    }
    String::new()
}

fn modify_nullable(_blueprint: &Blueprint, column: &ColumnDefinition) -> String {
    match (column.change, column.nullable) {
        (false, Some(true)) => " null".to_string(),
        (false, Some(false)) => " not null".to_string(),
        (true, Some(true)) => " drop not null".to_string(),
        (true, Some(false)) => " set not null".to_string(),
        (_, None) => String::new(),
    }
}

fn type_big_integer(column: &ColumnDefinition) -> String {
    if column.auto_increment { "bigserial" } else { "bigint" }.to_string()
}

fn type_integer(column: &ColumnDefinition) -> String {
    if column.auto_increment { "serial" } else { "integer" }.to_string()
}

fn type_small_integer(column: &ColumnDefinition) -> String {
    if column.auto_increment { "smallserial" } else { "smallint" }.to_string()
}

fn type_string(column: &ColumnDefinition) -> String {
    match column.length {
        Some(length) => format!("varchar({})", length),
        None => "varchar".to_string(),
    }
}

fn type_char(column: &ColumnDefinition) -> String {
    format!("char({})", column.length.unwrap_or(255))
}

fn type_text(_column: &ColumnDefinition) -> String {
    "text".to_string()
}

fn type_decimal(column: &ColumnDefinition) -> String {
    format!(
        "decimal({}, {})",
        column.total.unwrap_or(8),
        column.places.unwrap_or(2)
    )
}

fn type_float(column: &ColumnDefinition) -> String {
    match column.precision {
        Some(precision) => format!("float({})", precision),
        None => "float".to_string(),
    }
}

fn with_precision(base: &str, column: &ColumnDefinition, zone: &str) -> String {
    match column.precision {
        Some(precision) => format!("{}({}) {} time zone", base, precision, zone),
        None => format!("{} {} time zone", base, zone),
    }
}

fn type_timestamp(column: &ColumnDefinition) -> String {
    with_precision("timestamp", column, "without")
}

fn type_timestamp_tz(column: &ColumnDefinition) -> String {
    with_precision("timestamp", column, "with")
}

fn type_time(column: &ColumnDefinition) -> String {
    with_precision("time", column, "without")
}

fn type_time_tz(column: &ColumnDefinition) -> String {
    with_precision("time", column, "with")
}

fn type_enum(column: &ColumnDefinition) -> String {
    format!(
        "varchar(255) check ({} in ({}))",
        column.name,
        quoted_list(&column.allowed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> PostgresGrammar {
        PostgresGrammar::new()
    }

    #[test]
    fn test_create_with_prefixed_table() {
        let mut blueprint = Blueprint::new("name_table", "strata_");
        blueprint.create();
        blueprint.string("name", None);

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec!["create table strata_name_table (name varchar(255))"]
        );
    }

    #[test]
    fn test_create_users_table() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.id();
        blueprint.string("email", Some(100)).not_null().unique();
        blueprint.boolean("active").default(true);
        blueprint.timestamps();

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec![
                "create table users (id bigserial primary key, email varchar(100) not null, \
                 active boolean default '1', \
                 created_at timestamp without time zone null, \
                 updated_at timestamp without time zone null)"
                    .to_string(),
                "alter table users add constraint users_email_unique unique (email)".to_string(),
            ]
        );
    }

    #[test]
    fn test_increment_adds_primary_key_on_alter() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.integer("age").auto_increment().unsigned();

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec!["alter table users add column age serial primary key"]
        );
    }

    #[test]
    fn test_increment_skipped_when_primary_command_exists() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.integer("age").auto_increment();
        blueprint.primary(&["age"]);

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec![
                "create table users (age serial)",
                "alter table users add primary key (age)",
            ]
        );
    }

    #[test]
    fn test_change_uses_alter_style_modifiers() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.string("name", Some(50)).nullable().change();
        blueprint.integer("score").default(10).not_null().change();

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec![
                "alter table users alter column name type varchar(50), \
                 alter column name drop default, \
                 alter column name drop not null, \
                 alter column score type integer, \
                 alter column score set default '10', \
                 alter column score set not null"
            ]
        );
    }

    #[test]
    fn test_add_and_change_then_comment() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.text("bio").comment("about me");
        blueprint.integer("age").change();

        let statements = blueprint.to_sql(&grammar()).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "alter table users add column bio text");
        assert!(statements[1].starts_with("alter table users alter column age type integer"));
        assert_eq!(statements[2], "comment on column users.bio is 'about me'");
    }

    #[test]
    fn test_table_commands() {
        let mut blueprint = Blueprint::new("users", "app_");
        blueprint.drop_column(&["a", "b"]);
        blueprint.rename_column("nick", "nickname");
        blueprint.index(&["email"]).algorithm("hash");
        blueprint.foreign(&["team_id"]).references(&["id"]).on("teams").cascade_on_delete();
        blueprint.drop_primary();
        blueprint.drop_unique(&["email"]);
        blueprint.drop_index_by_name("by_email");
        blueprint.rename_index("a_idx", "b_idx");
        blueprint.rename("members");

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec![
                "alter table app_users drop column a, drop column b",
                "alter table app_users rename column nick to nickname",
                "create index app_users_email_index on app_users using hash (email)",
                "alter table app_users add constraint app_users_team_id_foreign foreign key (team_id) \
                 references app_teams (id) on delete cascade",
                "alter table app_users drop constraint app_users_pkey",
                "alter table app_users drop constraint app_users_email_unique",
                "drop index by_email",
                "alter index a_idx rename to b_idx",
                "alter table app_users rename to app_members",
            ]
        );
    }

    #[test]
    fn test_drop_commands() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.drop_if_exists();
        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec!["drop table if exists users"]
        );

        assert_eq!(
            grammar().compile_drop_all_tables(&["a".to_string(), "b".to_string()]),
            vec!["drop table a, b cascade"]
        );
        assert!(grammar().compile_drop_all_tables(&[]).is_empty());
    }

    #[test]
    fn test_types() {
        let mut blueprint = Blueprint::new("t", "");
        blueprint.create();
        blueprint.decimal("price");
        blueprint.timestamp_tz("seen_at").precision(3);
        blueprint.enum_column("state", &["on", "off"]);
        blueprint.uuid("key");
        blueprint.binary("blob");

        assert_eq!(
            blueprint.to_sql(&grammar()).unwrap(),
            vec![
                "create table t (price decimal(8, 2), seen_at timestamp(3) with time zone, \
                 state varchar(255) check (state in ('on', 'off')), key uuid, blob bytea)"
            ]
        );
    }
}
