//! Blueprint commands and their fluent builders

use std::fmt;

use super::column::ColumnDefinition;

/// Kind of table-alteration directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Create,
    Drop,
    DropIfExists,
    Rename,
    Add,
    Change,
    DropColumn,
    RenameColumn,
    Comment,
    Primary,
    Unique,
    Index,
    Foreign,
    DropPrimary,
    DropUnique,
    DropIndex,
    DropForeign,
    RenameIndex,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Create => "create",
            CommandKind::Drop => "drop",
            CommandKind::DropIfExists => "dropIfExists",
            CommandKind::Rename => "rename",
            CommandKind::Add => "add",
            CommandKind::Change => "change",
            CommandKind::DropColumn => "dropColumn",
            CommandKind::RenameColumn => "renameColumn",
            CommandKind::Comment => "comment",
            CommandKind::Primary => "primary",
            CommandKind::Unique => "unique",
            CommandKind::Index => "index",
            CommandKind::Foreign => "foreign",
            CommandKind::DropPrimary => "dropPrimary",
            CommandKind::DropUnique => "dropUnique",
            CommandKind::DropIndex => "dropIndex",
            CommandKind::DropForeign => "dropForeign",
            CommandKind::RenameIndex => "renameIndex",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic directive inside a blueprint
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    /// Column an attribute command is bound to
    pub column: Option<ColumnDefinition>,
    pub columns: Vec<String>,
    /// Index or constraint name
    pub index: Option<String>,
    pub algorithm: Option<String>,
    /// Referenced table of a foreign key
    pub on: Option<String>,
    pub references: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            column: None,
            columns: Vec::new(),
            index: None,
            algorithm: None,
            on: None,
            references: Vec::new(),
            on_delete: None,
            on_update: None,
            from: None,
            to: None,
            value: None,
        }
    }

    /// Attribute command bound to a column
    pub fn for_column(kind: CommandKind, column: &ColumnDefinition) -> Self {
        let mut command = Self::new(kind);
        command.column = Some(column.clone());
        command
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    /// Index name, empty when none was assigned
    pub fn index_name(&self) -> &str {
        self.index.as_deref().unwrap_or_default()
    }
}

/// Fluent handle over an index-like command (`primary`, `unique`, `index`)
pub struct IndexDefinition<'a> {
    command: &'a mut Command,
}

impl<'a> IndexDefinition<'a> {
    pub(crate) fn new(command: &'a mut Command) -> Self {
        Self { command }
    }

    /// Override the generated index name
    pub fn name(self, name: &str) -> Self {
        self.command.index = Some(name.to_string());
        self
    }

    /// Index method, e.g. `btree` or `gin`
    pub fn algorithm(self, algorithm: &str) -> Self {
        self.command.algorithm = Some(algorithm.to_string());
        self
    }
}

/// Fluent handle over a `foreign` command
pub struct ForeignKeyDefinition<'a> {
    command: &'a mut Command,
}

impl<'a> ForeignKeyDefinition<'a> {
    pub(crate) fn new(command: &'a mut Command) -> Self {
        Self { command }
    }

    pub fn references(self, columns: &[&str]) -> Self {
        self.command.references = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Referenced table (unprefixed)
    pub fn on(self, table: &str) -> Self {
        self.command.on = Some(table.to_string());
        self
    }

    pub fn name(self, name: &str) -> Self {
        self.command.index = Some(name.to_string());
        self
    }

    pub fn on_delete(self, action: &str) -> Self {
        self.command.on_delete = Some(action.to_string());
        self
    }

    pub fn on_update(self, action: &str) -> Self {
        self.command.on_update = Some(action.to_string());
        self
    }

    pub fn cascade_on_delete(self) -> Self {
        self.on_delete("cascade")
    }

    pub fn restrict_on_delete(self) -> Self {
        self.on_delete("restrict")
    }

    pub fn null_on_delete(self) -> Self {
        self.on_delete("set null")
    }

    pub fn no_action_on_delete(self) -> Self {
        self.on_delete("no action")
    }

    pub fn cascade_on_update(self) -> Self {
        self.on_update("cascade")
    }

    pub fn restrict_on_update(self) -> Self {
        self.on_update("restrict")
    }
}
