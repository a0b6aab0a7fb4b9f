//! `#[schema("...")]` field tags
//!
//! A tag is a `;` separated list of settings. Keys are case-insensitive:
//!
//! | setting | meaning |
//! |---|---|
//! | `column:name` | column name |
//! | `type:varchar(100)` | explicit column type |
//! | `size:100` | string length |
//! | `precision:10` / `scale:2` | decimal total / places, time precision |
//! | `default:0` | default value |
//! | `comment:text` | column comment |
//! | `unique` / `index` | single-column unique key / index |
//! | `index:name` / `uniqueIndex:name` | named (possibly composite) index |
//! | `not null` / `nullable` | nullability |
//! | `unsigned` / `autoIncrement` / `primaryKey` | column flags |
//! | `enum(a,b)` | enum column with allowed values |
//! | `-` | skip the field |

use crate::error::{CodegenError, CodegenResult};

/// Explicit `type:` setting, e.g. `varchar(100)` → name `varchar`, args `["100"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagType {
    pub name: String,
    pub args: Vec<String>,
}

/// Parsed schema tag of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTag {
    pub skip: bool,
    pub column: Option<String>,
    pub column_type: Option<TagType>,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<String>,
    pub comment: Option<String>,
    pub unique: bool,
    pub index: bool,
    /// Named indexes the column belongs to, in tag order
    pub indexes: Vec<String>,
    pub unique_indexes: Vec<String>,
    /// `Some(true)` for `nullable`, `Some(false)` for `not null`
    pub nullable: Option<bool>,
    pub unsigned: bool,
    pub auto_increment: bool,
    pub primary_key: bool,
    /// Values of `enum(a,b)`
    pub allowed: Vec<String>,
}

impl SchemaTag {
    pub fn parse(field: &str, tag: &str) -> CodegenResult<Self> {
        let mut parsed = SchemaTag::default();

        for setting in tag.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if setting == "-" {
                parsed.skip = true;
                continue;
            }

            let (key, value) = match setting.split_once(':') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (setting, None),
            };
            let lowered = key.to_ascii_lowercase();

            if lowered.starts_with("enum(") {
                parsed.allowed = parse_args(field, setting)?.1;
                if parsed.allowed.is_empty() {
                    return Err(CodegenError::invalid_tag(field, "enum() needs at least one value"));
                }
                continue;
            }

            match (lowered.as_str(), value) {
                ("column", Some(v)) => parsed.column = Some(non_empty(field, "column", v)?),
                ("type", Some(v)) => {
                    let (name, args) = parse_args(field, v)?;
                    parsed.column_type = Some(TagType {
                        name: name.to_ascii_lowercase(),
                        args,
                    });
                }
                ("size", Some(v)) => parsed.size = Some(number(field, "size", v)?),
                ("precision", Some(v)) => parsed.precision = Some(number(field, "precision", v)?),
                ("scale", Some(v)) => parsed.scale = Some(number(field, "scale", v)?),
                ("default", Some(v)) => parsed.default = Some(v.to_string()),
                ("comment", Some(v)) => parsed.comment = Some(v.to_string()),
                ("unique", None) => parsed.unique = true,
                ("index", None) => parsed.index = true,
                ("index", Some(v)) => parsed.indexes.push(non_empty(field, "index", v)?),
                ("uniqueindex", None) => parsed.unique = true,
                ("uniqueindex", Some(v)) => parsed.unique_indexes.push(non_empty(field, "uniqueIndex", v)?),
                ("not null", None) | ("notnull", None) => parsed.nullable = Some(false),
                ("nullable", None) | ("null", None) => parsed.nullable = Some(true),
                ("unsigned", None) => parsed.unsigned = true,
                ("autoincrement", None) => parsed.auto_increment = true,
                ("primarykey", None) => parsed.primary_key = true,
                _ => {
                    return Err(CodegenError::invalid_tag(
                        field,
                        format!("unknown setting '{}'", setting),
                    ))
                }
            }
        }

        Ok(parsed)
    }
}

/// `varchar(100)` → (`varchar`, [`100`]); `text` → (`text`, [])
fn parse_args(field: &str, value: &str) -> CodegenResult<(String, Vec<String>)> {
    let Some(open) = value.find('(') else {
        return Ok((value.trim().to_string(), Vec::new()));
    };
    if !value.ends_with(')') {
        return Err(CodegenError::invalid_tag(
            field,
            format!("unbalanced parentheses in '{}'", value),
        ));
    }

    let name = value[..open].trim().to_string();
    let args = value[open + 1..value.len() - 1]
        .split(',')
        .map(|arg| arg.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string())
        .filter(|arg| !arg.is_empty())
        .collect();
    Ok((name, args))
}

fn number(field: &str, key: &str, value: &str) -> CodegenResult<u32> {
    value.parse().map_err(|_| {
        CodegenError::invalid_tag(field, format!("{} must be a positive integer, got '{}'", key, value))
    })
}

fn non_empty(field: &str, key: &str, value: &str) -> CodegenResult<String> {
    if value.is_empty() {
        Err(CodegenError::invalid_tag(field, format!("{} needs a value", key)))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let tag = SchemaTag::parse(
            "price",
            "column:unit_price; type:decimal(10,2); default:0; comment:Net price; not null; index:idx_price",
        )
        .unwrap();

        assert_eq!(tag.column.as_deref(), Some("unit_price"));
        assert_eq!(
            tag.column_type,
            Some(TagType {
                name: "decimal".to_string(),
                args: vec!["10".to_string(), "2".to_string()],
            })
        );
        assert_eq!(tag.default.as_deref(), Some("0"));
        assert_eq!(tag.comment.as_deref(), Some("Net price"));
        assert_eq!(tag.nullable, Some(false));
        assert_eq!(tag.indexes, vec!["idx_price"]);
        assert!(!tag.skip);
    }

    #[test]
    fn test_flags_and_enum() {
        let tag = SchemaTag::parse("status", "enum('draft', 'published');uniqueIndex:uq_status;UNSIGNED;primaryKey").unwrap();
        assert_eq!(tag.allowed, vec!["draft", "published"]);
        assert_eq!(tag.unique_indexes, vec!["uq_status"]);
        assert!(tag.unsigned);
        assert!(tag.primary_key);

        assert!(SchemaTag::parse("cache", "-").unwrap().skip);
    }

    #[test]
    fn test_malformed_tags() {
        for tag in ["size:big", "colour:red", "type:varchar(10", "enum()", "column:", "sorted"] {
            let err = SchemaTag::parse("field", tag).unwrap_err();
            assert!(matches!(err, CodegenError::InvalidTag { .. }), "{} should be rejected", tag);
        }
    }
}
