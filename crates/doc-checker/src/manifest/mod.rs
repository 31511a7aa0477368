mod domain;
mod loader;

pub use domain::{Manifest, OpportunityEntry, OpportunitySummary, Requirement};
pub use loader::{ManifestLoader, ManifestUpdate};
