//! Model Mapper - derives blueprint statements from a model struct
//!
//! The output is the body of a `schema.create(table, |table| { ... })`
//! callback: one `table.<builder>(...)<modifiers>;` line per column, in this
//! order:
//!
//! 1. `table.id();` when the model has an id
//! 2. one line per mapped field, in declaration order
//! 3. `table.timestamps();` and `table.soft_deletes();` for the markers
//! 4. a blank line followed by the named indexes, in first-seen order

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{CodegenError, CodegenResult};
use crate::model::{FieldDescriptor, FieldType, ModelDescriptor};
use crate::tags::{SchemaTag, TagType};

/// Marker field types
const MODEL_MARKER: &str = "Model";
const TIMESTAMPS_MARKER: &str = "Timestamps";
const SOFT_DELETES_MARKER: &str = "SoftDeletes";

const RELATION_TYPES: &[&str] = &[
    "HasOne",
    "HasMany",
    "BelongsTo",
    "BelongsToMany",
    "MorphOne",
    "MorphMany",
    "MorphTo",
];

const INTEGER_TYPES: &[&str] = &["i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize"];

/// Table name plus the blueprint statement lines for a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSchema {
    pub table: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
struct NamedIndex {
    unique: bool,
    columns: Vec<String>,
}

struct ColumnLine {
    call: String,
    modifiers: Vec<String>,
}

impl ColumnLine {
    fn new(method: &str, column: &str) -> Self {
        Self {
            call: format!("{}({:?})", method, column),
            modifiers: Vec::new(),
        }
    }

    fn with_args(method: &str, column: &str, args: &str) -> Self {
        Self {
            call: format!("{}({:?}, {})", method, column, args),
            modifiers: Vec::new(),
        }
    }

    fn modifier(&mut self, modifier: impl Into<String>) {
        self.modifiers.push(modifier.into());
    }

    fn render(&self) -> String {
        format!("table.{}{};", self.call, self.modifiers.concat())
    }
}

/// Map a model to its table name and blueprint lines
pub fn generate(model: &ModelDescriptor) -> CodegenResult<GeneratedSchema> {
    let mut has_id = false;
    let mut timestamps = false;
    let mut soft_deletes = false;
    let mut columns = Vec::new();
    let mut indexes: IndexMap<String, NamedIndex> = IndexMap::new();

    for field in &model.fields {
        let Some(ty) = &field.ty else {
            debug!("Skipping field {}: unsupported type", field.name);
            continue;
        };

        match ty.ident.as_str() {
            MODEL_MARKER => {
                has_id = true;
                timestamps = true;
                continue;
            }
            TIMESTAMPS_MARKER => {
                timestamps = true;
                continue;
            }
            SOFT_DELETES_MARKER => {
                soft_deletes = true;
                continue;
            }
            _ => {}
        }

        if !field.is_pub {
            continue;
        }

        let tag = match &field.tag {
            Some(tag) => Some(SchemaTag::parse(&field.name, tag)?),
            None => None,
        };
        if tag.as_ref().is_some_and(|t| t.skip) {
            continue;
        }

        let (base, optional) = unwrap_option(ty);

        if tag.is_none() && field.name == "id" && INTEGER_TYPES.contains(&base.ident.as_str()) {
            has_id = true;
            continue;
        }
        if is_relation(base) {
            debug!("Skipping relation field {}", field.name);
            continue;
        }

        let tag = tag.unwrap_or_default();
        let column = tag.column.clone().unwrap_or_else(|| field.name.clone());

        let Some(mut line) = column_line(field, base, &tag, &column)? else {
            debug!("Skipping field {}: no column type for {}", field.name, ty);
            continue;
        };
        apply_modifiers(&mut line, &tag, optional);
        columns.push(line.render());

        for name in &tag.indexes {
            indexes.entry(name.clone()).or_default().columns.push(column.clone());
        }
        for name in &tag.unique_indexes {
            let index = indexes.entry(name.clone()).or_default();
            index.unique = true;
            index.columns.push(column.clone());
        }
    }

    if !has_id && columns.is_empty() && !timestamps && !soft_deletes {
        return Err(CodegenError::invalid_model(
            &model.name,
            "no fields map to columns",
        ));
    }

    let mut lines = Vec::with_capacity(columns.len() + indexes.len() + 4);
    if has_id {
        lines.push("table.id();".to_string());
    }
    lines.extend(columns);
    if timestamps {
        lines.push("table.timestamps();".to_string());
    }
    if soft_deletes {
        lines.push("table.soft_deletes();".to_string());
    }
    if !indexes.is_empty() {
        lines.push(String::new());
        for (name, index) in &indexes {
            let columns: Vec<String> = index.columns.iter().map(|c| format!("{:?}", c)).collect();
            lines.push(format!(
                "table.{}(&[{}]).name({:?});",
                if index.unique { "unique" } else { "index" },
                columns.join(", "),
                name
            ));
        }
    }

    Ok(GeneratedSchema {
        table: model.table_name.clone(),
        lines,
    })
}

fn unwrap_option(ty: &FieldType) -> (&FieldType, bool) {
    match (ty.is("Option"), ty.inner()) {
        (true, Some(inner)) => (inner, true),
        _ => (ty, false),
    }
}

fn is_relation(ty: &FieldType) -> bool {
    RELATION_TYPES.contains(&ty.ident.as_str())
        || ty.is("Box")
        || (ty.is("Vec") && !ty.inner().is_some_and(|inner| inner.is("u8")))
}

fn column_line(
    field: &FieldDescriptor,
    ty: &FieldType,
    tag: &SchemaTag,
    column: &str,
) -> CodegenResult<Option<ColumnLine>> {
    if let Some(tag_type) = &tag.column_type {
        return tagged_column(field, tag_type, tag, column).map(Some);
    }
    if !tag.allowed.is_empty() {
        return Ok(Some(enum_column(column, &tag.allowed)));
    }

    let line = match ty.ident.as_str() {
        "String" | "str" => match tag.size {
            Some(size) => ColumnLine::with_args("string", column, &format!("Some({})", size)),
            None => ColumnLine::new("text", column),
        },
        "i8" => ColumnLine::new("tiny_integer", column),
        "i16" => ColumnLine::new("small_integer", column),
        "i32" => ColumnLine::new("integer", column),
        "i64" | "isize" => ColumnLine::new("big_integer", column),
        "u8" => ColumnLine::new("unsigned_tiny_integer", column),
        "u16" => ColumnLine::new("unsigned_small_integer", column),
        "u32" => ColumnLine::new("unsigned_integer", column),
        "u64" | "usize" => ColumnLine::new("unsigned_big_integer", column),
        "bool" => ColumnLine::new("boolean", column),
        "f32" => with_precision(ColumnLine::new("float", column), tag),
        "f64" => ColumnLine::new("double", column),
        "Decimal" | "BigDecimal" => decimal(column, tag.precision, tag.scale),
        "DateTime" => with_precision(ColumnLine::new("timestamp_tz", column), tag),
        "NaiveDateTime" => with_precision(ColumnLine::new("timestamp", column), tag),
        "NaiveDate" => ColumnLine::new("date", column),
        "NaiveTime" => with_precision(ColumnLine::new("time", column), tag),
        "Uuid" => ColumnLine::new("uuid", column),
        "Value" | "JsonValue" | "Json" => ColumnLine::new("json", column),
        "Vec" if ty.inner().is_some_and(|inner| inner.is("u8")) => ColumnLine::new("binary", column),
        _ => return Ok(None),
    };
    Ok(Some(line))
}

fn tagged_column(
    field: &FieldDescriptor,
    tag_type: &TagType,
    tag: &SchemaTag,
    column: &str,
) -> CodegenResult<ColumnLine> {
    let first_arg = |name: &str| -> CodegenResult<Option<u32>> {
        match tag_type.args.first() {
            Some(arg) => arg.parse().map(Some).map_err(|_| {
                CodegenError::invalid_tag(&field.name, format!("{} expects a number, got '{}'", name, arg))
            }),
            None => Ok(None),
        }
    };
    let optional_length = |length: Option<u32>| match length {
        Some(length) => format!("Some({})", length),
        None => "None".to_string(),
    };

    let line = match tag_type.name.as_str() {
        "varchar" | "string" => {
            let length = first_arg("varchar")?.or(tag.size);
            ColumnLine::with_args("string", column, &optional_length(length))
        }
        "char" => {
            let length = first_arg("char")?.or(tag.size);
            ColumnLine::with_args("char", column, &optional_length(length))
        }
        "text" => ColumnLine::new("text", column),
        "tinytext" => ColumnLine::new("tiny_text", column),
        "mediumtext" => ColumnLine::new("medium_text", column),
        "longtext" => ColumnLine::new("long_text", column),
        "int" | "integer" => ColumnLine::new("integer", column),
        "bigint" => ColumnLine::new("big_integer", column),
        "mediumint" => ColumnLine::new("medium_integer", column),
        "smallint" => ColumnLine::new("small_integer", column),
        "tinyint" => ColumnLine::new("tiny_integer", column),
        "serial" => ColumnLine::new("increments", column),
        "bigserial" => ColumnLine::new("big_increments", column),
        "bool" | "boolean" => ColumnLine::new("boolean", column),
        "decimal" | "numeric" => {
            let total = first_arg("decimal")?.or(tag.precision);
            let places = match tag_type.args.get(1) {
                Some(arg) => Some(arg.parse().map_err(|_| {
                    CodegenError::invalid_tag(&field.name, format!("decimal scale must be a number, got '{}'", arg))
                })?),
                None => tag.scale,
            };
            decimal(column, total, places)
        }
        "double" => ColumnLine::new("double", column),
        "float" | "real" => with_precision_value(ColumnLine::new("float", column), first_arg("float")?.or(tag.precision)),
        "date" => ColumnLine::new("date", column),
        "datetime" => with_precision_value(ColumnLine::new("date_time", column), first_arg("datetime")?.or(tag.precision)),
        "timestamp" => with_precision_value(ColumnLine::new("timestamp", column), first_arg("timestamp")?.or(tag.precision)),
        "timestamptz" => {
            with_precision_value(ColumnLine::new("timestamp_tz", column), first_arg("timestamptz")?.or(tag.precision))
        }
        "time" => with_precision_value(ColumnLine::new("time", column), first_arg("time")?.or(tag.precision)),
        "timetz" => with_precision_value(ColumnLine::new("time_tz", column), first_arg("timetz")?.or(tag.precision)),
        "json" => ColumnLine::new("json", column),
        "jsonb" => ColumnLine::new("jsonb", column),
        "uuid" => ColumnLine::new("uuid", column),
        "binary" | "blob" | "bytea" => ColumnLine::new("binary", column),
        "enum" if !tag_type.args.is_empty() => enum_column(column, &tag_type.args),
        other => {
            return Err(CodegenError::invalid_tag(
                &field.name,
                format!("unknown column type '{}'", other),
            ))
        }
    };
    Ok(line)
}

fn enum_column(column: &str, allowed: &[String]) -> ColumnLine {
    let values: Vec<String> = allowed.iter().map(|v| format!("{:?}", v)).collect();
    ColumnLine::with_args("enum_column", column, &format!("&[{}]", values.join(", ")))
}

fn decimal(column: &str, total: Option<u32>, places: Option<u32>) -> ColumnLine {
    let mut line = ColumnLine::new("decimal", column);
    if let Some(total) = total {
        line.modifier(format!(".total({})", total));
    }
    if let Some(places) = places {
        line.modifier(format!(".places({})", places));
    }
    line
}

fn with_precision(line: ColumnLine, tag: &SchemaTag) -> ColumnLine {
    with_precision_value(line, tag.precision)
}

fn with_precision_value(mut line: ColumnLine, precision: Option<u32>) -> ColumnLine {
    if let Some(precision) = precision {
        line.modifier(format!(".precision({})", precision));
    }
    line
}

fn apply_modifiers(line: &mut ColumnLine, tag: &SchemaTag, optional: bool) {
    if tag.unsigned {
        line.modifier(".unsigned()");
    }
    if tag.auto_increment {
        line.modifier(".auto_increment()");
    }
    match tag.nullable {
        Some(true) => line.modifier(".nullable()"),
        Some(false) => line.modifier(".not_null()"),
        None if optional => line.modifier(".nullable()"),
        None => {}
    }
    if let Some(default) = &tag.default {
        line.modifier(default_modifier(default));
    }
    if let Some(comment) = &tag.comment {
        line.modifier(format!(".comment({:?})", comment));
    }
    if tag.primary_key {
        line.modifier(".primary()");
    }
    if tag.unique {
        line.modifier(".unique()");
    }
    if tag.index {
        line.modifier(".index()");
    }
}

/// Render `default:<value>` as a Rust call on the column
fn default_modifier(value: &str) -> String {
    let lowered = value.to_ascii_lowercase();
    if lowered == "current_timestamp" || lowered == "now()" {
        return ".use_current()".to_string();
    }
    if lowered == "true" || lowered == "false" {
        return format!(".default({})", lowered);
    }
    if let Ok(number) = value.parse::<i64>() {
        return if i32::try_from(number).is_ok() {
            format!(".default({})", number)
        } else {
            format!(".default({}_i64)", number)
        };
    }
    if value.contains('.') && value.parse::<f64>().is_ok_and(f64::is_finite) {
        return format!(".default({})", value);
    }

    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .unwrap_or(value);
    format!(".default({:?})", unquoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(source: &str, name: &str) -> ModelDescriptor {
        ModelDescriptor::parse(source, name).unwrap()
    }

    #[test]
    fn test_markers_and_untagged_string() {
        let source = r#"
            pub struct Article {
                pub model: Model,
                pub title: String,
                pub deleted: SoftDeletes,
            }
        "#;
        let schema = generate(&model(source, "Article")).unwrap();

        assert_eq!(schema.table, "articles");
        assert_eq!(
            schema.lines,
            vec![
                "table.id();",
                "table.text(\"title\");",
                "table.timestamps();",
                "table.soft_deletes();",
            ]
        );
    }

    #[test]
    fn test_rust_type_table() {
        let source = r#"
            pub struct Account {
                pub id: i64,
                pub age: i32,
                pub balance: u64,
                pub active: bool,
                pub ratio: f64,
                pub external_id: Uuid,
                pub settings: serde_json::Value,
                pub avatar: Vec<u8>,
                pub verified_at: Option<chrono::DateTime<Utc>>,
                pub born_on: NaiveDate,
            }
        "#;
        let schema = generate(&model(source, "Account")).unwrap();

        assert_eq!(
            schema.lines,
            vec![
                "table.id();",
                "table.integer(\"age\");",
                "table.unsigned_big_integer(\"balance\");",
                "table.boolean(\"active\");",
                "table.double(\"ratio\");",
                "table.uuid(\"external_id\");",
                "table.json(\"settings\");",
                "table.binary(\"avatar\");",
                "table.timestamp_tz(\"verified_at\").nullable();",
                "table.date(\"born_on\");",
            ]
        );
    }

    #[test]
    fn test_skips_private_relation_and_unknown_fields() {
        let source = r#"
            pub struct Post {
                pub body: String,
                pub comments: Vec<Comment>,
                pub author: BelongsTo<User>,
                pub parent: Option<Box<Post>>,
                pub address: Address,
                #[schema("-")]
                pub cached_html: String,
                draft: bool,
            }
        "#;
        let schema = generate(&model(source, "Post")).unwrap();
        assert_eq!(schema.lines, vec!["table.text(\"body\");"]);
    }

    #[test]
    fn test_tags_choose_builder_and_modifiers() {
        let source = r#"
            pub struct Product {
                #[schema("size:100;not null;unique")]
                pub name: String,
                #[schema("type:decimal(10,2);default:0;comment:Net price")]
                pub price: f64,
                #[schema("enum(draft,live);default:'draft'")]
                pub status: String,
                #[schema("column:stock_count;unsigned;index")]
                pub stock: Option<i32>,
                #[schema("default:CURRENT_TIMESTAMP")]
                pub listed_at: NaiveDateTime,
            }
        "#;
        let schema = generate(&model(source, "Product")).unwrap();

        assert_eq!(
            schema.lines,
            vec![
                "table.string(\"name\", Some(100)).not_null().unique();",
                "table.decimal(\"price\").total(10).places(2).default(0).comment(\"Net price\");",
                "table.enum_column(\"status\", &[\"draft\", \"live\"]).default(\"draft\");",
                "table.integer(\"stock_count\").unsigned().nullable().index();",
                "table.timestamp(\"listed_at\").use_current();",
            ]
        );
    }

    #[test]
    fn test_named_indexes_render_after_blank_line() {
        let source = r#"
            pub struct Membership {
                #[schema("index:idx_member")]
                pub team_id: i64,
                #[schema("index:idx_member;uniqueIndex:uq_email")]
                pub user_id: i64,
                #[schema("uniqueIndex:uq_email;type:varchar(190)")]
                pub email: String,
            }
        "#;
        let schema = generate(&model(source, "Membership")).unwrap();

        assert_eq!(
            schema.lines,
            vec![
                "table.big_integer(\"team_id\");",
                "table.big_integer(\"user_id\");",
                "table.string(\"email\", Some(190));",
                "",
                "table.index(&[\"team_id\", \"user_id\"]).name(\"idx_member\");",
                "table.unique(&[\"user_id\", \"email\"]).name(\"uq_email\");",
            ]
        );
    }

    #[test]
    fn test_explicit_table_name_and_tagged_id() {
        let source = r#"
            pub struct Person {
                #[schema("type:bigserial;primaryKey")]
                pub id: i64,
                pub timestamps: Timestamps,
            }
            impl Person {
                fn table_name() -> &'static str { "people" }
            }
        "#;
        let schema = generate(&model(source, "Person")).unwrap();

        assert_eq!(schema.table, "people");
        assert_eq!(
            schema.lines,
            vec!["table.big_increments(\"id\").primary();", "table.timestamps();"]
        );
    }

    #[test]
    fn test_errors() {
        let empty = model("pub struct Empty { secret: String }", "Empty");
        assert!(matches!(generate(&empty).unwrap_err(), CodegenError::InvalidModel { .. }));

        let bad_type = model(r#"pub struct Bad { #[schema("type:geometry")] pub shape: String }"#, "Bad");
        assert!(matches!(generate(&bad_type).unwrap_err(), CodegenError::InvalidTag { .. }));
    }
}
