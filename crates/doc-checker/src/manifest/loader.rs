use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use super::domain::{Manifest, OpportunitySummary};
use crate::gateway::{DocCheckerApi, GatewayError};

/// Result of a manifest fetch once it has been matched against the current
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestUpdate {
    /// The fetched manifest belongs to the selected opportunity and is now current.
    Current(Arc<Manifest>),
    /// Another opportunity was selected while this fetch was in flight; the
    /// response was dropped.
    Superseded { requested: String },
}

#[derive(Debug, Default)]
struct LoaderState {
    selected: Option<String>,
    manifest: Option<Arc<Manifest>>,
    index: Option<Arc<OpportunitySummary>>,
}

/// Fetches the opportunity catalog and the manifest of the selected
/// opportunity. Responses are tagged with the opportunity they were requested
/// for, so the last selection wins regardless of response order.
pub struct ManifestLoader {
    api: Arc<dyn DocCheckerApi>,
    state: Mutex<LoaderState>,
}

impl ManifestLoader {
    pub fn new(api: Arc<dyn DocCheckerApi>) -> Self {
        Self {
            api,
            state: Mutex::new(LoaderState::default()),
        }
    }

    pub async fn load_index(&self) -> Result<Arc<OpportunitySummary>, GatewayError> {
        let index = Arc::new(self.api.manifest_index().await?);
        debug!(opportunities = index.opportunities.len(), "loaded manifest index");
        self.lock().index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Selects `opportunity_id` and fetches its manifest. Failures of a fetch
    /// that has since been superseded are swallowed the same way as stale
    /// successes.
    pub async fn load_manifest(&self, opportunity_id: &str) -> Result<ManifestUpdate, GatewayError> {
        self.lock().selected = Some(opportunity_id.to_string());

        let fetched = self.api.manifest(opportunity_id).await;

        let mut state = self.lock();
        if state.selected.as_deref() != Some(opportunity_id) {
            info!(
                requested = opportunity_id,
                selected = state.selected.as_deref().unwrap_or_default(),
                "discarding manifest response for a superseded selection"
            );
            return Ok(ManifestUpdate::Superseded {
                requested: opportunity_id.to_string(),
            });
        }

        let manifest = Arc::new(fetched?);
        debug!(
            opportunity_id,
            requirements = manifest.requirements.len(),
            "manifest is current"
        );
        state.manifest = Some(Arc::clone(&manifest));
        Ok(ManifestUpdate::Current(manifest))
    }

    pub fn selected(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    /// Manifest of the most recently applied fetch. It may lag the selection
    /// while a fetch is still in flight.
    pub fn current(&self) -> Option<Arc<Manifest>> {
        self.lock().manifest.clone()
    }

    pub fn index(&self) -> Option<Arc<OpportunitySummary>> {
        self.lock().index.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
