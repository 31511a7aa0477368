//! Submission identity: the one piece of state shared by every upload.

mod identity;
mod lifecycle;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use identity::{
    FileSubmissionStore, MemorySubmissionStore, StoreError, SubmissionStore, STORAGE_KEY,
};
pub use lifecycle::{SubmissionError, SubmissionLifecycle};

/// Opaque submission token issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A client's in-progress attempt to satisfy one opportunity's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: SubmissionId,
    pub opportunity_id: String,
}
