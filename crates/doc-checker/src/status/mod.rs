mod domain;
mod reconciler;

pub use domain::{StatusEntry, StatusReport, StatusView, ValidationStatus};
pub use reconciler::StatusReconciler;
