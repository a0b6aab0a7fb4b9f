use std::path::PathBuf;

use thiserror::Error;

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Errors raised while mapping models or scaffolding migration files
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The model source has no usable struct, or nothing in it maps to a column
    #[error("Invalid model '{model}': {message}")]
    InvalidModel { model: String, message: String },

    /// A `#[schema("...")]` attribute could not be parsed
    #[error("Invalid schema tag on field '{field}': {message}")]
    InvalidTag { field: String, message: String },

    #[error("Model '{model}' not found in {}", dir.display())]
    ModelNotFound { model: String, dir: PathBuf },

    #[error("Invalid migration name: '{0}'")]
    InvalidName(String),

    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    pub fn invalid_model(model: impl Into<String>, message: impl Into<String>) -> Self {
        CodegenError::InvalidModel {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn invalid_tag(field: impl Into<String>, message: impl Into<String>) -> Self {
        CodegenError::InvalidTag {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<tera::Error> for CodegenError {
    fn from(err: tera::Error) -> Self {
        use std::error::Error as _;

        // tera keeps the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        CodegenError::Template(message)
    }
}
