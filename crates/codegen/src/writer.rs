use std::fs;
use std::path::Path;

use crate::error::{CodegenError, CodegenResult};

pub struct CodeWriter;

impl CodeWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write a new file, creating parent directories. Existing files are
    /// never overwritten.
    pub fn write_new(&self, path: &Path, content: &str) -> CodegenResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() {
            return Err(CodegenError::FileExists(path.to_path_buf()));
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Write `content` unless the file already holds exactly that
    pub fn write_if_changed(&self, path: &Path, content: &str) -> CodegenResult<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() && fs::read_to_string(path)? == content {
            return Ok(false);
        }

        fs::write(path, content)?;
        Ok(true)
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}
