use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gateway::wire::{blank_as_none, null_as_default};

const DEFAULT_MAX_MB: u32 = 25;
const DEFAULT_MAX_PAGES: u32 = 50;

/// One document obligation declared by an opportunity manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    /// Regular expression the backend checks filenames against.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub filename_pattern: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(
        rename = "content_types",
        default,
        deserialize_with = "null_as_default"
    )]
    pub allowed_content_types: Vec<String>,
    #[serde(rename = "max_mb", default = "default_max_mb")]
    pub max_size_mb: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_sections: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub notes: Option<String>,
}

fn default_required() -> bool {
    true
}

fn default_max_mb() -> u32 {
    DEFAULT_MAX_MB
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

impl Requirement {
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// One-line summary of the limits, e.g. `Required • Max 25MB • Up to 50 pages`.
    pub fn limits_line(&self) -> String {
        format!(
            "{} • Max {}MB • Up to {} pages",
            if self.required { "Required" } else { "Optional" },
            self.max_size_mb,
            self.max_pages
        )
    }

    /// Human-readable validation rules the backend applies to this document.
    pub fn rule_summary(&self) -> Vec<String> {
        let mut rules = Vec::new();
        if let Some(pattern) = &self.filename_pattern {
            rules.push(format!("Filename must match regex: {pattern}"));
        }
        if !self.allowed_content_types.is_empty() {
            rules.push(format!(
                "Allowed types: {}",
                self.allowed_content_types.join(", ")
            ));
        }
        if !self.required_sections.is_empty() {
            rules.push(format!(
                "Required sections: {}",
                self.required_sections.join(", ")
            ));
        }
        if let Some(notes) = &self.notes {
            rules.push(notes.clone());
        }
        rules
    }
}

/// Requirement list for one opportunity. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub opportunity_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "documents", default, deserialize_with = "null_as_default")]
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    pub fn requirement(&self, requirement_id: &str) -> Option<&Requirement> {
        self.requirements
            .iter()
            .find(|requirement| requirement.id == requirement_id)
    }

    pub fn required(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(|requirement| requirement.required)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityEntry {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
}

/// Catalog of opportunities with a manifest, keyed by opportunity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunitySummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub opportunities: BTreeMap<String, OpportunityEntry>,
}

impl OpportunitySummary {
    /// Title to show for an opportunity, falling back to its id.
    pub fn title_for<'a>(&'a self, opportunity_id: &'a str) -> &'a str {
        self.opportunities
            .get(opportunity_id)
            .and_then(|entry| entry.title.as_deref())
            .unwrap_or(opportunity_id)
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.opportunities
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.title.as_deref().unwrap_or(id.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}
