//! Where sequence definitions come from.

use super::definition::DefinitionFormat;
use crate::errors::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A raw definition document read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Identifier used in errors, e.g. the file path.
    pub id: String,
    /// Default sequence name when the document names none.
    pub default_name: String,
    /// Document format.
    pub format: DefinitionFormat,
    /// Document text.
    pub raw: String,
}

/// Supplies the definition documents for one refresh.
///
/// A source returns every document it currently holds, in a stable order.
pub trait DefinitionSource: Send + Sync + fmt::Debug {
    /// Reads all documents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the source or one of its documents cannot
    /// be read.
    fn load(&self) -> Result<Vec<SourceDocument>, ConfigError>;
}

/// A directory of definition files, one sequence per file.
///
/// Files are read in lexical name order. Files whose extension is not a
/// supported format are ignored, as are subdirectories.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Creates a source over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory being read.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DefinitionSource for DirectorySource {
    fn load(&self) -> Result<Vec<SourceDocument>, ConfigError> {
        let dir_id = self.dir.display().to_string();
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| ConfigError::new(&dir_id, format!("cannot read directory: {e}")))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ConfigError::new(&dir_id, format!("cannot list directory: {e}")))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match DefinitionFormat::from_path(&path) {
                Some(format) => files.push((path, format)),
                None => debug!(path = %path.display(), "ignoring file with unsupported extension"),
            }
        }
        files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

        files
            .into_iter()
            .map(|(path, format)| {
                let id = path.display().to_string();
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::new(&id, format!("cannot read file: {e}")))?;
                let default_name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(SourceDocument {
                    id,
                    default_name,
                    format,
                    raw,
                })
            })
            .collect()
    }
}

/// An in-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<SourceDocument>,
}

impl StaticSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document; `name` is both its identifier and default sequence name.
    #[must_use]
    pub fn with_document(
        mut self,
        name: impl Into<String>,
        format: DefinitionFormat,
        raw: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.documents.push(SourceDocument {
            id: name.clone(),
            default_name: name,
            format,
            raw: raw.into(),
        });
        self
    }
}

impl DefinitionSource for StaticSource {
    fn load(&self) -> Result<Vec<SourceDocument>, ConfigError> {
        Ok(self.documents.clone())
    }
}
