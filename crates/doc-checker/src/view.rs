use std::collections::BTreeMap;

use serde::Serialize;

use crate::manifest::{Manifest, Requirement};
use crate::status::{StatusEntry, StatusView, ValidationStatus};

/// Display state of one requirement: the requirement joined with its status
/// entry (pending when absent) and any transfer in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementView {
    pub requirement: Requirement,
    pub status: ValidationStatus,
    pub filename: Option<String>,
    pub messages: Vec<String>,
    pub progress: Option<u8>,
}

impl RequirementView {
    pub fn join(requirement: &Requirement, entry: StatusEntry, progress: Option<u8>) -> Self {
        Self {
            requirement: requirement.clone(),
            status: entry.status,
            filename: entry.filename,
            messages: entry.messages,
            progress,
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.progress.is_some()
    }

    /// Required documents not yet accepted by the backend.
    pub fn is_outstanding(&self) -> bool {
        self.requirement.required && !self.status.is_accepted()
    }
}

/// Builds the view of every requirement in `manifest`, in manifest order.
pub fn build_view(
    manifest: &Manifest,
    status: Option<&StatusView>,
    progress: &BTreeMap<String, u8>,
) -> Vec<RequirementView> {
    manifest
        .requirements
        .iter()
        .map(|requirement| {
            let entry = status
                .map(|view| view.entry(&requirement.id))
                .unwrap_or_else(|| StatusEntry::pending(&requirement.id));
            RequirementView::join(requirement, entry, progress.get(&requirement.id).copied())
        })
        .collect()
}
