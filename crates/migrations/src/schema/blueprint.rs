//! Blueprint - in-memory description of one table operation
//!
//! A blueprint collects columns and commands for a single create / alter /
//! drop of one table and compiles itself into SQL with a [`Grammar`].

use super::column::{ColumnDefinition, ColumnType};
use super::command::{Command, CommandKind, ForeignKeyDefinition, IndexDefinition};
use super::grammars::Grammar;
use crate::error::MigrationResult;

/// Length used by `string` and `char` columns when none is given
pub const DEFAULT_STRING_LENGTH: u32 = 255;

#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    table: String,
    prefix: String,
    columns: Vec<ColumnDefinition>,
    commands: Vec<Command>,
}

impl Blueprint {
    pub fn new(table: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            prefix: prefix.into(),
            columns: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Unprefixed table name
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Table name including the connection prefix
    pub fn table_name(&self) -> String {
        format!("{}{}", self.prefix, self.table)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Columns to be added (not marked as change)
    pub fn added_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| !c.change).collect()
    }

    /// Columns altering an existing column
    pub fn changed_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.change).collect()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn has_command(&self, kind: CommandKind) -> bool {
        self.commands.iter().any(|c| c.kind == kind)
    }

    /// Commands of one kind, in order
    pub fn commands_of(&self, kind: CommandKind) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.kind == kind).collect()
    }

    pub fn is_create(&self) -> bool {
        self.has_command(CommandKind::Create)
    }

    /// Compile every command into SQL statements, in order
    pub fn to_sql(&self, grammar: &dyn Grammar) -> MigrationResult<Vec<String>> {
        let compiled = self.with_implied_commands(grammar);

        let mut statements = Vec::new();
        for command in &compiled.commands {
            statements.extend(grammar.compile_command(&compiled, command)?);
        }

        Ok(statements)
    }

    /// Copy of this blueprint with the implied `add` / `change` commands
    /// prepended and fluent-index and attribute commands appended
    pub fn with_implied_commands(&self, grammar: &dyn Grammar) -> Blueprint {
        let mut compiled = self.clone();

        let mut commands = Vec::new();
        if !compiled.is_create() {
            if !compiled.added_columns().is_empty() {
                commands.push(Command::new(CommandKind::Add));
            }
            if !compiled.changed_columns().is_empty() {
                commands.push(Command::new(CommandKind::Change));
            }
        }
        commands.append(&mut compiled.commands);
        compiled.commands = commands;

        compiled.add_fluent_indexes();
        compiled.add_attribute_commands(grammar);
        compiled
    }

    fn add_fluent_indexes(&mut self) {
        let mut fluent = Vec::new();
        for column in &self.columns {
            let flags = [
                (column.primary, CommandKind::Primary),
                (column.unique, CommandKind::Unique),
                (column.index, CommandKind::Index),
            ];
            for (set, kind) in flags {
                if set {
                    fluent.push(
                        Command::new(kind)
                            .with_columns(&[column.name.as_str()])
                            .with_index(self.create_index_name(kind, &[column.name.as_str()])),
                    );
                }
            }
        }
        self.commands.extend(fluent);
    }

    fn add_attribute_commands(&mut self, grammar: &dyn Grammar) {
        for kind in grammar.attribute_commands() {
            let bound: Vec<Command> = self
                .columns
                .iter()
                .filter(|column| has_attribute(*kind, column))
                .map(|column| Command::for_column(*kind, column))
                .collect();
            self.commands.extend(bound);
        }
    }

    /// `<prefix><table>_<columns>_<kind>`, lower-cased, with `-` and `.`
    /// replaced by `_`
    pub fn create_index_name(&self, kind: CommandKind, columns: &[&str]) -> String {
        let suffix = match kind {
            CommandKind::Primary | CommandKind::DropPrimary => "primary",
            CommandKind::Unique | CommandKind::DropUnique => "unique",
            CommandKind::Foreign | CommandKind::DropForeign => "foreign",
            _ => "index",
        };

        format!("{}_{}_{}", self.table_name(), columns.join("_"), suffix)
            .replace(['-', '.'], "_")
            .to_lowercase()
    }

    fn add_command(&mut self, command: Command) -> &mut Command {
        let index = self.commands.len();
        self.commands.push(command);
        &mut self.commands[index]
    }

    fn index_command(&mut self, kind: CommandKind, columns: &[&str]) -> IndexDefinition<'_> {
        let name = self.create_index_name(kind, columns);
        let command = self.add_command(Command::new(kind).with_columns(columns).with_index(name));
        IndexDefinition::new(command)
    }

    fn drop_index_command(&mut self, kind: CommandKind, columns: &[&str]) {
        let name = self.create_index_name(kind, columns);
        self.add_command(Command::new(kind).with_columns(columns).with_index(name));
    }

    // Table commands

    pub fn create(&mut self) {
        self.add_command(Command::new(CommandKind::Create));
    }

    pub fn drop(&mut self) {
        self.add_command(Command::new(CommandKind::Drop));
    }

    pub fn drop_if_exists(&mut self) {
        self.add_command(Command::new(CommandKind::DropIfExists));
    }

    /// Rename the table to `to` (unprefixed)
    pub fn rename(&mut self, to: &str) {
        let from = self.table.clone();
        self.add_command(Command::new(CommandKind::Rename).with_rename(from, to));
    }

    pub fn drop_column(&mut self, columns: &[&str]) {
        self.add_command(Command::new(CommandKind::DropColumn).with_columns(columns));
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        self.add_command(Command::new(CommandKind::RenameColumn).with_rename(from, to));
    }

    pub fn primary(&mut self, columns: &[&str]) -> IndexDefinition<'_> {
        self.index_command(CommandKind::Primary, columns)
    }

    pub fn unique(&mut self, columns: &[&str]) -> IndexDefinition<'_> {
        self.index_command(CommandKind::Unique, columns)
    }

    pub fn index(&mut self, columns: &[&str]) -> IndexDefinition<'_> {
        self.index_command(CommandKind::Index, columns)
    }

    pub fn foreign(&mut self, columns: &[&str]) -> ForeignKeyDefinition<'_> {
        let name = self.create_index_name(CommandKind::Foreign, columns);
        let command = self.add_command(
            Command::new(CommandKind::Foreign)
                .with_columns(columns)
                .with_index(name),
        );
        ForeignKeyDefinition::new(command)
    }

    pub fn drop_primary(&mut self) {
        self.add_command(Command::new(CommandKind::DropPrimary));
    }

    pub fn drop_unique(&mut self, columns: &[&str]) {
        self.drop_index_command(CommandKind::DropUnique, columns);
    }

    pub fn drop_unique_by_name(&mut self, name: &str) {
        self.add_command(Command::new(CommandKind::DropUnique).with_index(name));
    }

    pub fn drop_index(&mut self, columns: &[&str]) {
        self.drop_index_command(CommandKind::DropIndex, columns);
    }

    pub fn drop_index_by_name(&mut self, name: &str) {
        self.add_command(Command::new(CommandKind::DropIndex).with_index(name));
    }

    pub fn drop_foreign(&mut self, columns: &[&str]) {
        self.drop_index_command(CommandKind::DropForeign, columns);
    }

    pub fn drop_foreign_by_name(&mut self, name: &str) {
        self.add_command(Command::new(CommandKind::DropForeign).with_index(name));
    }

    pub fn rename_index(&mut self, from: &str, to: &str) {
        self.add_command(Command::new(CommandKind::RenameIndex).with_rename(from, to));
    }

    // Columns

    /// Add a column of any type
    pub fn add_column(&mut self, column_type: ColumnType, name: &str) -> &mut ColumnDefinition {
        let index = self.columns.len();
        self.columns.push(ColumnDefinition::new(name, column_type));
        &mut self.columns[index]
    }

    /// Auto-incrementing unsigned big integer `id`
    pub fn id(&mut self) -> &mut ColumnDefinition {
        self.big_increments("id")
    }

    pub fn big_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.unsigned_big_integer(name).auto_increment()
    }

    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.unsigned_integer(name).auto_increment()
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::BigInteger, name)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Integer, name)
    }

    pub fn medium_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::MediumInteger, name)
    }

    pub fn small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::SmallInteger, name)
    }

    pub fn tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TinyInteger, name)
    }

    pub fn unsigned_big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.big_integer(name).unsigned()
    }

    pub fn unsigned_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.integer(name).unsigned()
    }

    pub fn unsigned_medium_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.medium_integer(name).unsigned()
    }

    pub fn unsigned_small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.small_integer(name).unsigned()
    }

    pub fn unsigned_tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.tiny_integer(name).unsigned()
    }

    /// Variable-length string, 255 characters unless `length` is given
    pub fn string(&mut self, name: &str, length: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::String, name)
            .length(length.unwrap_or(DEFAULT_STRING_LENGTH))
    }

    pub fn char(&mut self, name: &str, length: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Char, name)
            .length(length.unwrap_or(DEFAULT_STRING_LENGTH))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Text, name)
    }

    pub fn tiny_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TinyText, name)
    }

    pub fn medium_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::MediumText, name)
    }

    pub fn long_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::LongText, name)
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Boolean, name)
    }

    /// Fixed-point number, `decimal(8, 2)` unless total / places are set
    pub fn decimal(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Decimal, name).total(8).places(2)
    }

    pub fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Double, name)
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Float, name).precision(53)
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Date, name)
    }

    pub fn date_time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::DateTime, name)
    }

    pub fn date_time_tz(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::DateTimeTz, name)
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Time, name)
    }

    pub fn time_tz(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TimeTz, name)
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Timestamp, name)
    }

    pub fn timestamp_tz(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TimestampTz, name)
    }

    /// Nullable `created_at` and `updated_at`
    pub fn timestamps(&mut self) {
        self.timestamp("created_at").nullable();
        self.timestamp("updated_at").nullable();
    }

    pub fn timestamps_tz(&mut self) {
        self.timestamp_tz("created_at").nullable();
        self.timestamp_tz("updated_at").nullable();
    }

    /// Nullable `deleted_at`
    pub fn soft_deletes(&mut self) -> &mut ColumnDefinition {
        self.timestamp("deleted_at").nullable()
    }

    pub fn soft_deletes_tz(&mut self) -> &mut ColumnDefinition {
        self.timestamp_tz("deleted_at").nullable()
    }

    pub fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Json, name)
    }

    pub fn jsonb(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Jsonb, name)
    }

    pub fn uuid(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Uuid, name)
    }

    pub fn binary(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Binary, name)
    }

    /// Column restricted to `allowed` values
    pub fn enum_column(&mut self, name: &str, allowed: &[&str]) -> &mut ColumnDefinition {
        let column = self.add_column(ColumnType::Enum, name);
        column.allowed = allowed.iter().map(|v| v.to_string()).collect();
        column
    }
}

fn has_attribute(kind: CommandKind, column: &ColumnDefinition) -> bool {
    match kind {
        CommandKind::Comment => column.comment.is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::grammars::PostgresGrammar;

    #[test]
    fn test_added_and_changed_partition() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.string("name", None);
        blueprint.integer("age").change();

        let added: Vec<&str> = blueprint.added_columns().iter().map(|c| c.name.as_str()).collect();
        let changed: Vec<&str> = blueprint.changed_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(added, vec!["name"]);
        assert_eq!(changed, vec!["age"]);
    }

    #[test]
    fn test_implied_commands_are_prepended_for_alter() {
        let grammar = PostgresGrammar::new();
        let mut blueprint = Blueprint::new("users", "");
        blueprint.rename_column("nick", "nickname");
        blueprint.string("name", None).comment("display name");
        blueprint.integer("age").change();

        let compiled = blueprint.with_implied_commands(&grammar);
        let kinds: Vec<CommandKind> = compiled.commands().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Add,
                CommandKind::Change,
                CommandKind::RenameColumn,
                CommandKind::Comment,
            ]
        );
        assert_eq!(
            compiled.commands()[3].column.as_ref().map(|c| c.name.as_str()),
            Some("name")
        );
    }

    #[test]
    fn test_no_implied_commands_for_create() {
        let grammar = PostgresGrammar::new();
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.string("name", None);

        let compiled = blueprint.with_implied_commands(&grammar);
        let kinds: Vec<CommandKind> = compiled.commands().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CommandKind::Create]);
    }

    #[test]
    fn test_compiling_does_not_mutate_the_blueprint() {
        let grammar = PostgresGrammar::new();
        let mut blueprint = Blueprint::new("users", "");
        blueprint.string("name", None);

        let first = blueprint.to_sql(&grammar).unwrap();
        let second = blueprint.to_sql(&grammar).unwrap();
        assert_eq!(first, second);
        assert!(blueprint.commands().is_empty());
    }

    #[test]
    fn test_index_names() {
        let mut blueprint = Blueprint::new("users", "app_");
        assert_eq!(
            blueprint.create_index_name(CommandKind::Unique, &["email", "tenant-id"]),
            "app_users_email_tenant_id_unique"
        );

        blueprint.index(&["name"]).name("by_name").algorithm("btree");
        let command = &blueprint.commands()[0];
        assert_eq!(command.index_name(), "by_name");
        assert_eq!(command.algorithm.as_deref(), Some("btree"));
    }

    #[test]
    fn test_fluent_unique_becomes_command() {
        let grammar = PostgresGrammar::new();
        let mut blueprint = Blueprint::new("users", "");
        blueprint.create();
        blueprint.string("email", None).unique();

        let compiled = blueprint.with_implied_commands(&grammar);
        let unique = compiled.commands_of(CommandKind::Unique);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].index_name(), "users_email_unique");
    }

    #[test]
    fn test_string_default_length() {
        let mut blueprint = Blueprint::new("users", "");
        blueprint.string("name", None);
        blueprint.string("code", Some(12));
        assert_eq!(blueprint.columns()[0].length, Some(255));
        assert_eq!(blueprint.columns()[1].length, Some(12));
    }
}
