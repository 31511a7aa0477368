use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::SubmissionId;

/// Well-known key the submission id is persisted under.
pub const STORAGE_KEY: &str = "grant-doc-checker-submission";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to read stored submission id at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to persist submission id at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Durable slot holding at most one submission id.
pub trait SubmissionStore: Send + Sync {
    fn get(&self) -> Result<Option<SubmissionId>, StoreError>;

    /// `None` clears the slot.
    fn set(&self, submission_id: Option<&SubmissionId>) -> Result<(), StoreError>;
}

/// Keeps the id in a single file so it survives restarts. Writes go through a
/// sibling temp file and a rename, so readers never observe a torn id.
#[derive(Debug, Clone)]
pub struct FileSubmissionStore {
    path: PathBuf,
}

impl FileSubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in `state_dir` using [`STORAGE_KEY`] as the file name.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(STORAGE_KEY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SubmissionStore for FileSubmissionStore {
    fn get(&self) -> Result<Option<SubmissionId>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                Ok((!trimmed.is_empty()).then(|| SubmissionId::from(trimmed)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn set(&self, submission_id: Option<&SubmissionId>) -> Result<(), StoreError> {
        let Some(submission_id) = submission_id else {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(self.write_error(source)),
            };
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, submission_id.as_str()).map_err(|source| self.write_error(source))?;
        fs::rename(&staging, &self.path).map_err(|source| self.write_error(source))
    }
}

/// Process-local store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    slot: Mutex<Option<SubmissionId>>,
}

impl MemorySubmissionStore {
    pub fn with_id(submission_id: impl Into<SubmissionId>) -> Self {
        Self {
            slot: Mutex::new(Some(submission_id.into())),
        }
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn get(&self) -> Result<Option<SubmissionId>, StoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set(&self, submission_id: Option<&SubmissionId>) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = submission_id.cloned();
        Ok(())
    }
}
