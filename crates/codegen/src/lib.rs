//! # strata-codegen
//!
//! Model-to-schema mapping and migration scaffolding.
//!
//! - [`ModelDescriptor`] reads a model struct out of Rust source with `syn`
//! - [`generate`] maps a model to the blueprint lines of its create migration
//! - [`MigrationCreator`] renders a migration stub and writes it to disk

pub mod creator;
pub mod error;
pub mod guesser;
pub mod inflection;
pub mod mapper;
pub mod model;
pub mod tags;
pub mod templates;
pub mod writer;

pub use creator::{CreatedMigration, MigrationCreator};
pub use error::{CodegenError, CodegenResult};
pub use guesser::{TableGuess, TableGuesser};
pub use mapper::{generate, GeneratedSchema};
pub use model::{FieldDescriptor, FieldType, ModelDescriptor};
pub use tags::{SchemaTag, TagType};
pub use templates::{MigrationStubs, StubContext, StubKind};
pub use writer::CodeWriter;
