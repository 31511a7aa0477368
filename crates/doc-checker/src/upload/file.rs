use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// Content type sent when a file does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} does not name a file")]
    MissingFileName { path: PathBuf },
}

/// A file chosen for upload: its name, declared content type, and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Reads `path` and declares a content type guessed from its extension.
    pub async fn from_path(path: &Path) -> Result<Self, FileError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FileError::MissingFileName {
                path: path.to_path_buf(),
            })?
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(Self::new(filename, content_type, bytes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared type, or [`DEFAULT_CONTENT_TYPE`] when it is missing or blank.
    pub fn effective_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
