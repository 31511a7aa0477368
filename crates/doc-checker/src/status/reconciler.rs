use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::domain::StatusView;
use crate::gateway::{DocCheckerApi, GatewayError};
use crate::submission::SubmissionId;

#[derive(Debug, Default)]
struct ReconcilerState {
    issued: u64,
    applied: u64,
    view: Option<Arc<StatusView>>,
}

/// Holds the latest status view of the active submission. Each refresh
/// replaces the view outright; nothing from a previous view is carried over.
pub struct StatusReconciler {
    api: Arc<dyn DocCheckerApi>,
    state: Mutex<ReconcilerState>,
}

impl StatusReconciler {
    pub fn new(api: Arc<dyn DocCheckerApi>) -> Self {
        Self {
            api,
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Fetches status for `submission_id` and installs it as the current view,
    /// unless a later refresh or a [`clear`](Self::clear) has happened since
    /// this one was issued. The fetched view is returned either way.
    pub async fn refresh(&self, submission_id: &SubmissionId) -> Result<Arc<StatusView>, GatewayError> {
        let ticket = {
            let mut state = self.lock();
            state.issued += 1;
            state.issued
        };

        let report = self.api.status(submission_id).await?;
        let view = Arc::new(StatusView::from_report(report));

        let mut state = self.lock();
        if ticket > state.applied {
            state.applied = ticket;
            state.view = Some(Arc::clone(&view));
            debug!(%submission_id, entries = view.len(), "status view replaced");
        } else {
            debug!(%submission_id, ticket, "dropping status response overtaken by a newer refresh");
        }
        Ok(view)
    }

    pub fn current(&self) -> Option<Arc<StatusView>> {
        self.lock().view.clone()
    }

    /// Drops the current view; refreshes still in flight will not reinstall it.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.view = None;
        state.applied = state.issued;
    }

    fn lock(&self) -> MutexGuard<'_, ReconcilerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
