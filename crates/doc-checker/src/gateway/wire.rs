//! Request and response bodies exchanged with the backend that have no
//! domain counterpart of their own.

use serde::{Deserialize, Deserializer, Serialize};

use crate::submission::SubmissionId;
use crate::upload::UploadDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSubmissionRequest {
    pub opportunity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSubmissionResponse {
    pub submission_id: SubmissionId,
    #[serde(default)]
    pub opportunity_id: Option<String>,
}

/// Body of `POST /upload-url`. The backend expects `contentType` in camel case
/// while every other field is snake case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUrlRequest {
    pub filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub submission_id: SubmissionId,
    pub opportunity_id: String,
    pub requirement_id: String,
}

/// One-shot authorization to transfer a file. `submission_id` may differ from
/// the one sent when the backend rotated the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadGrant {
    pub submission_id: SubmissionId,
    #[serde(default)]
    pub requirement_id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    pub upload: UploadDescriptor,
}

/// Treats an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Blank strings carry no information; read them as absent.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}
