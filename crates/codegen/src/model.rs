//! Model descriptors read from Rust source
//!
//! A model is a struct with named fields. Its table name comes from a
//! `fn table_name()` in any `impl` block for the struct when that function
//! returns a string literal, e.g.
//!
//! ```ignore
//! impl Model for Post {
//!     fn table_name() -> &'static str {
//!         "blog_posts"
//!     }
//! }
//! ```
//!
//! and is derived from the struct name otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use syn::{Expr, Fields, GenericArgument, ImplItem, Item, Lit, PathArguments, Stmt, Type, Visibility};
use tracing::debug;

use crate::error::{CodegenError, CodegenResult};
use crate::inflection::{table_name_for, to_snake_case};

/// A field type reduced to its last path segment and generic arguments:
/// `Option<chrono::DateTime<Utc>>` → `Option<DateTime<Utc>>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub ident: String,
    pub args: Vec<FieldType>,
}

impl FieldType {
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(ident: impl Into<String>, args: Vec<FieldType>) -> Self {
        Self {
            ident: ident.into(),
            args,
        }
    }

    pub fn is(&self, ident: &str) -> bool {
        self.ident == ident
    }

    /// First generic argument, e.g. `T` of `Option<T>`
    pub fn inner(&self) -> Option<&FieldType> {
        self.args.first()
    }

    fn from_syn(ty: &Type) -> Option<Self> {
        match ty {
            Type::Path(type_path) => {
                let segment = type_path.path.segments.last()?;
                let args = match &segment.arguments {
                    PathArguments::AngleBracketed(generics) => generics
                        .args
                        .iter()
                        .filter_map(|arg| match arg {
                            GenericArgument::Type(ty) => FieldType::from_syn(ty),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Some(FieldType::with_args(segment.ident.to_string(), args))
            }
            Type::Reference(reference) => FieldType::from_syn(&reference.elem),
            Type::Paren(paren) => FieldType::from_syn(&paren.elem),
            Type::Group(group) => FieldType::from_syn(&group.elem),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.ident)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// One named field of a model struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// `None` for types that are not plain paths (tuples, arrays, fn pointers)
    pub ty: Option<FieldType>,
    pub is_pub: bool,
    /// Contents of the `#[schema("...")]` attribute
    pub tag: Option<String>,
}

/// Struct name, table name and fields of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub table_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    /// Parse the struct called `model` out of a Rust source file
    pub fn parse(source: &str, model: &str) -> CodegenResult<Self> {
        let file = syn::parse_file(source)
            .map_err(|e| CodegenError::invalid_model(model, format!("source does not parse: {}", e)))?;

        let item = file
            .items
            .iter()
            .find(|item| item_name(item).as_deref() == Some(model))
            .ok_or_else(|| CodegenError::invalid_model(model, "no item with this name"))?;

        let Item::Struct(item_struct) = item else {
            return Err(CodegenError::invalid_model(model, "not a struct"));
        };

        let Fields::Named(named) = &item_struct.fields else {
            return Err(CodegenError::invalid_model(model, "struct has no named fields"));
        };

        let mut fields = Vec::with_capacity(named.named.len());
        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let name = ident.to_string();
            fields.push(FieldDescriptor {
                tag: schema_tag(&field.attrs, &name)?,
                ty: FieldType::from_syn(&field.ty),
                is_pub: matches!(field.vis, Visibility::Public(_)),
                name,
            });
        }

        let table_name = declared_table_name(&file.items, model).unwrap_or_else(|| table_name_for(model));

        Ok(Self {
            name: model.to_string(),
            table_name,
            fields,
        })
    }

    /// Find and parse `model` under `models_dir`.
    ///
    /// `<models_dir>/<snake_case(model)>.rs` is tried first, then every `.rs`
    /// file below the directory.
    pub fn load(models_dir: &Path, model: &str) -> CodegenResult<Self> {
        let conventional = models_dir.join(format!("{}.rs", to_snake_case(model)));
        if conventional.is_file() {
            let source = fs::read_to_string(&conventional)?;
            if defines(&source, model) {
                debug!("Loading model {} from {}", model, conventional.display());
                return Self::parse(&source, model);
            }
        }

        for path in rust_files(models_dir)? {
            let source = fs::read_to_string(&path)?;
            if defines(&source, model) {
                debug!("Loading model {} from {}", model, path.display());
                return Self::parse(&source, model);
            }
        }

        Err(CodegenError::ModelNotFound {
            model: model.to_string(),
            dir: models_dir.to_path_buf(),
        })
    }
}

fn item_name(item: &Item) -> Option<String> {
    match item {
        Item::Struct(s) => Some(s.ident.to_string()),
        Item::Enum(e) => Some(e.ident.to_string()),
        Item::Union(u) => Some(u.ident.to_string()),
        Item::Type(t) => Some(t.ident.to_string()),
        Item::Trait(t) => Some(t.ident.to_string()),
        Item::Fn(f) => Some(f.sig.ident.to_string()),
        _ => None,
    }
}

fn schema_tag(attrs: &[syn::Attribute], field: &str) -> CodegenResult<Option<String>> {
    for attr in attrs {
        if attr.path().is_ident("schema") {
            let tag = attr
                .parse_args::<syn::LitStr>()
                .map_err(|e| CodegenError::invalid_tag(field, format!("expected a string literal: {}", e)))?;
            return Ok(Some(tag.value()));
        }
    }
    Ok(None)
}

fn declared_table_name(items: &[Item], model: &str) -> Option<String> {
    items.iter().find_map(|item| {
        let Item::Impl(item_impl) = item else {
            return None;
        };
        let self_ty = FieldType::from_syn(&item_impl.self_ty)?;
        if self_ty.ident != model {
            return None;
        }
        item_impl.items.iter().find_map(|impl_item| match impl_item {
            ImplItem::Fn(function) if function.sig.ident == "table_name" => {
                function.block.stmts.last().and_then(|stmt| match stmt {
                    Stmt::Expr(expr, _) => string_literal(expr),
                    _ => None,
                })
            }
            _ => None,
        })
    })
}

/// `"x"`, `"x".to_string()`, `"x".into()`, `String::from("x")`, `return "x"`
fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::MethodCall(call) if call.args.is_empty() => string_literal(&call.receiver),
        Expr::Call(call) if call.args.len() == 1 => call.args.first().and_then(string_literal),
        Expr::Return(ret) => ret.expr.as_deref().and_then(string_literal),
        Expr::Paren(paren) => string_literal(&paren.expr),
        _ => None,
    }
}

fn defines(source: &str, model: &str) -> bool {
    source.contains(&format!("struct {}", model))
}

fn rust_files(dir: &Path) -> CodegenResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
