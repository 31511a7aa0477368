use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::gateway::wire::null_as_default;
use crate::submission::SubmissionId;

/// Validation state the backend reports for a requirement. Values this client
/// does not recognise, including `null` and non-strings, read as
/// [`ValidationStatus::Pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Valid,
    Passed,
    NeedsReview,
    Invalid,
    Error,
}

impl ValidationStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "valid" => Self::Valid,
            "passed" => Self::Passed,
            "needs_review" => Self::NeedsReview,
            "invalid" => Self::Invalid,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Passed => "passed",
            Self::NeedsReview => "needs_review",
            Self::Invalid => "invalid",
            Self::Error => "error",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Valid => "Ready",
            Self::Passed => "Passed",
            Self::NeedsReview => "Needs review",
            Self::Invalid => "Invalid",
            Self::Error => "Error",
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Valid | Self::Passed)
    }

    pub fn needs_attention(self) -> bool {
        matches!(self, Self::NeedsReview | Self::Invalid | Self::Error)
    }
}

impl From<String> for ValidationStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for ValidationStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Self::parse).unwrap_or_default())
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend verdict for one requirement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub requirement_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: ValidationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<String>,
}

impl StatusEntry {
    pub fn pending(requirement_id: impl Into<String>) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            filename: None,
            status: ValidationStatus::Pending,
            messages: Vec::new(),
        }
    }
}

/// Body of `GET /status/<submission_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub submission_id: SubmissionId,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub overall: ValidationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<StatusEntry>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// RFC 3339 timestamps, or offset-less ones read as UTC. Anything else is
/// dropped rather than failing the report.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let Some(text) = raw.as_str().map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Ok(Some(naive.and_utc())),
        Err(err) => {
            debug!(value = text, error = %err, "ignoring unreadable status timestamp");
            Ok(None)
        }
    }
}

/// Status of a submission keyed by requirement id. Built from exactly one
/// report; requirements the report omits are pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub submission_id: SubmissionId,
    pub opportunity_id: Option<String>,
    pub overall: ValidationStatus,
    pub updated_at: Option<DateTime<Utc>>,
    entries: HashMap<String, StatusEntry>,
}

impl StatusView {
    pub fn from_report(report: StatusReport) -> Self {
        let entries = report
            .files
            .into_iter()
            .map(|entry| (entry.requirement_id.clone(), entry))
            .collect();

        Self {
            submission_id: report.submission_id,
            opportunity_id: report.opportunity_id,
            overall: report.overall,
            updated_at: report.updated_at,
            entries,
        }
    }

    pub fn get(&self, requirement_id: &str) -> Option<&StatusEntry> {
        self.entries.get(requirement_id)
    }

    /// Entry for `requirement_id`, or a pending placeholder when absent.
    pub fn entry(&self, requirement_id: &str) -> StatusEntry {
        self.entries
            .get(requirement_id)
            .cloned()
            .unwrap_or_else(|| StatusEntry::pending(requirement_id))
    }

    pub fn status_of(&self, requirement_id: &str) -> ValidationStatus {
        self.entries
            .get(requirement_id)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
