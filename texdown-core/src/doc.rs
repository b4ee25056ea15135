//! Source documents read from disk or a stream

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Markdown source waiting to be rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Where the source came from; `None` for streams
    pub path: Option<PathBuf>,
    pub source: String,
}

impl Document {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Read a whole document from a stream such as stdin
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut source = String::new();
        reader
            .read_to_string(&mut source)
            .context("Failed to read document from stream")?;

        Ok(Self { path: None, source })
    }

    /// File stem, used as a page title
    pub fn name(&self) -> Option<String> {
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
    }
}
