//! Table name guessing from migration names

use regex::Regex;
use serde::Serialize;

use crate::error::{CodegenError, CodegenResult};

const CREATE_PATTERNS: [&str; 2] = [r"^create_(\w+)_table$", r"^create_(\w+)$"];
const CHANGE_PATTERNS: [&str; 2] = [r"_(?:to|from|in)_(\w+)_table$", r"_(?:to|from|in)_(\w+)$"];

/// Table a migration name refers to, and whether it creates that table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableGuess {
    pub table: String,
    pub create: bool,
}

pub struct TableGuesser {
    create: Vec<Regex>,
    change: Vec<Regex>,
}

impl TableGuesser {
    pub fn new() -> CodegenResult<Self> {
        let compile = |patterns: &[&str]| -> CodegenResult<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(|e| CodegenError::Template(format!("Regex error: {}", e))))
                .collect()
        };

        Ok(Self {
            create: compile(&CREATE_PATTERNS)?,
            change: compile(&CHANGE_PATTERNS)?,
        })
    }

    /// `create_users_table` → create `users`;
    /// `add_votes_to_users_table` → alter `users`
    pub fn guess(&self, name: &str) -> Option<TableGuess> {
        if let Some(table) = first_capture(&self.create, name) {
            return Some(TableGuess { table, create: true });
        }
        first_capture(&self.change, name).map(|table| TableGuess { table, create: false })
    }
}

fn first_capture(patterns: &[Regex], name: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(name)
            .and_then(|captures| captures.get(1))
            .map(|table| table.as_str().to_string())
    })
}
