//! Column definitions
//!
//! A [`ColumnDefinition`] only records semantic attributes. Turning them into
//! SQL is the grammar's job.

use std::fmt;

/// Semantic column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    BigInteger,
    Integer,
    MediumInteger,
    SmallInteger,
    TinyInteger,
    String,
    Char,
    Text,
    TinyText,
    MediumText,
    LongText,
    Boolean,
    Decimal,
    Double,
    Float,
    Date,
    DateTime,
    DateTimeTz,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Json,
    Jsonb,
    Uuid,
    Binary,
    Enum,
}

impl ColumnType {
    /// Every known type tag
    pub const ALL: [ColumnType; 27] = [
        ColumnType::BigInteger,
        ColumnType::Integer,
        ColumnType::MediumInteger,
        ColumnType::SmallInteger,
        ColumnType::TinyInteger,
        ColumnType::String,
        ColumnType::Char,
        ColumnType::Text,
        ColumnType::TinyText,
        ColumnType::MediumText,
        ColumnType::LongText,
        ColumnType::Boolean,
        ColumnType::Decimal,
        ColumnType::Double,
        ColumnType::Float,
        ColumnType::Date,
        ColumnType::DateTime,
        ColumnType::DateTimeTz,
        ColumnType::Time,
        ColumnType::TimeTz,
        ColumnType::Timestamp,
        ColumnType::TimestampTz,
        ColumnType::Json,
        ColumnType::Jsonb,
        ColumnType::Uuid,
        ColumnType::Binary,
        ColumnType::Enum,
    ];

    /// The type tag as written in blueprints, e.g. `bigInteger`
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::BigInteger => "bigInteger",
            ColumnType::Integer => "integer",
            ColumnType::MediumInteger => "mediumInteger",
            ColumnType::SmallInteger => "smallInteger",
            ColumnType::TinyInteger => "tinyInteger",
            ColumnType::String => "string",
            ColumnType::Char => "char",
            ColumnType::Text => "text",
            ColumnType::TinyText => "tinyText",
            ColumnType::MediumText => "mediumText",
            ColumnType::LongText => "longText",
            ColumnType::Boolean => "boolean",
            ColumnType::Decimal => "decimal",
            ColumnType::Double => "double",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
            ColumnType::DateTime => "dateTime",
            ColumnType::DateTimeTz => "dateTimeTz",
            ColumnType::Time => "time",
            ColumnType::TimeTz => "timeTz",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestampTz",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Uuid => "uuid",
            ColumnType::Binary => "binary",
            ColumnType::Enum => "enum",
        }
    }

    /// Integer types that can carry auto-increment
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::BigInteger
                | ColumnType::Integer
                | ColumnType::MediumInteger
                | ColumnType::SmallInteger
                | ColumnType::TinyInteger
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown column type: {}", s))
    }
}

/// Column default value
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Raw SQL expression emitted verbatim, e.g. `CURRENT_TIMESTAMP`
    Expression(String),
}

impl DefaultValue {
    pub fn expression(sql: impl Into<String>) -> Self {
        DefaultValue::Expression(sql.into())
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Integer(value as i64)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Integer(value)
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        DefaultValue::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::String(value)
    }
}

/// One column of a blueprint.
///
/// `nullable` is tri-state: `None` leaves nullability to the database and
/// produces no SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub nullable: Option<bool>,
    pub default: Option<DefaultValue>,
    pub unsigned: bool,
    pub auto_increment: bool,
    pub change: bool,
    pub comment: Option<String>,
    pub total: Option<u32>,
    pub places: Option<u32>,
    pub precision: Option<u32>,
    pub allowed: Vec<String>,
    pub use_current: bool,
    pub use_current_on_update: bool,
    pub primary: bool,
    pub unique: bool,
    pub index: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            nullable: None,
            default: None,
            unsigned: false,
            auto_increment: false,
            change: false,
            comment: None,
            total: None,
            places: None,
            precision: None,
            allowed: Vec::new(),
            use_current: false,
            use_current_on_update: false,
            primary: false,
            unique: false,
            index: false,
        }
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    pub fn default(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Mark the column as an alteration of an existing column
    pub fn change(&mut self) -> &mut Self {
        self.change = true;
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn length(&mut self, length: u32) -> &mut Self {
        self.length = Some(length);
        self
    }

    pub fn total(&mut self, total: u32) -> &mut Self {
        self.total = Some(total);
        self
    }

    pub fn places(&mut self, places: u32) -> &mut Self {
        self.places = Some(places);
        self
    }

    pub fn precision(&mut self, precision: u32) -> &mut Self {
        self.precision = Some(precision);
        self
    }

    pub fn use_current(&mut self) -> &mut Self {
        self.use_current = true;
        self
    }

    pub fn use_current_on_update(&mut self) -> &mut Self {
        self.use_current_on_update = true;
        self
    }

    /// Add a primary key over this column alone
    pub fn primary(&mut self) -> &mut Self {
        self.primary = true;
        self
    }

    /// Add a unique index over this column alone
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Add a plain index over this column alone
    pub fn index(&mut self) -> &mut Self {
        self.index = true;
        self
    }

    /// The default to emit, taking `use_current` into account
    pub fn effective_default(&self) -> Option<DefaultValue> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if self.use_current => Some(DefaultValue::expression("CURRENT_TIMESTAMP")),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_mutators() {
        let mut column = ColumnDefinition::new("age", ColumnType::Integer);
        column.auto_increment().unsigned().nullable().comment("years");

        assert!(column.auto_increment);
        assert!(column.unsigned);
        assert_eq!(column.nullable, Some(true));
        assert_eq!(column.comment.as_deref(), Some("years"));
        assert!(!column.change);
    }

    #[test]
    fn test_type_tags_round_trip_through_from_str() {
        assert_eq!("bigInteger".parse::<ColumnType>(), Ok(ColumnType::BigInteger));
        assert_eq!("timestamptz".parse::<ColumnType>(), Ok(ColumnType::TimestampTz));
        assert!("geometry".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_use_current_sets_effective_default() {
        let mut column = ColumnDefinition::new("created_at", ColumnType::Timestamp);
        assert_eq!(column.effective_default(), None);

        column.use_current();
        assert_eq!(
            column.effective_default(),
            Some(DefaultValue::expression("CURRENT_TIMESTAMP"))
        );

        column.default("2024-01-01");
        assert_eq!(column.effective_default(), Some(DefaultValue::from("2024-01-01")));
    }
}
