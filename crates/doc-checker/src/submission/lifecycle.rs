use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use super::identity::{StoreError, SubmissionStore};
use super::{Submission, SubmissionId};
use crate::gateway::{DocCheckerApi, GatewayError};
use crate::status::StatusReconciler;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("unable to initialise submission: {0}")]
    Start(#[source] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sole owner of the current submission id. Every read-modify-write of the id
/// goes through this type.
pub struct SubmissionLifecycle {
    api: Arc<dyn DocCheckerApi>,
    store: Arc<dyn SubmissionStore>,
    status: Arc<StatusReconciler>,
    creation: AsyncMutex<()>,
}

impl SubmissionLifecycle {
    pub fn new(
        api: Arc<dyn DocCheckerApi>,
        store: Arc<dyn SubmissionStore>,
        status: Arc<StatusReconciler>,
    ) -> Self {
        Self {
            api,
            store,
            status,
            creation: AsyncMutex::new(()),
        }
    }

    pub fn current(&self) -> Result<Option<SubmissionId>, StoreError> {
        self.store.get()
    }

    /// Returns the stored id, creating a submission for `opportunity_id` only
    /// when none is stored. A stored id is returned as-is even if it was
    /// created for a different opportunity; switching opportunities requires
    /// an explicit [`reset`](Self::reset) or [`start`](Self::start).
    ///
    /// Concurrent callers share a single creation request.
    pub async fn ensure_submission(
        &self,
        opportunity_id: &str,
    ) -> Result<SubmissionId, SubmissionError> {
        if let Some(existing) = self.store.get()? {
            return Ok(existing);
        }

        let _creating = self.creation.lock().await;
        if let Some(existing) = self.store.get()? {
            return Ok(existing);
        }

        let submission = self.create(opportunity_id).await?;
        Ok(submission.submission_id)
    }

    /// Starts a fresh submission, replacing whatever id was stored and dropping
    /// the status view of the old one.
    pub async fn start(&self, opportunity_id: &str) -> Result<Submission, SubmissionError> {
        let _creating = self.creation.lock().await;
        self.status.clear();
        self.create(opportunity_id).await
    }

    /// Replaces the current id with one the backend handed back, e.g. after a
    /// rotation during descriptor issuance.
    pub fn adopt(&self, submission_id: &SubmissionId) -> Result<(), StoreError> {
        let current = self.store.get()?;
        if current.as_ref() == Some(submission_id) {
            return Ok(());
        }

        info!(
            previous = current.as_ref().map(SubmissionId::as_str).unwrap_or_default(),
            adopted = %submission_id,
            "backend rotated submission id"
        );
        self.store.set(Some(submission_id))
    }

    /// Forgets the stored id and the status view tied to it.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.set(None)?;
        self.status.clear();
        info!("submission reset");
        Ok(())
    }

    async fn create(&self, opportunity_id: &str) -> Result<Submission, SubmissionError> {
        let submission = self
            .api
            .start_submission(opportunity_id)
            .await
            .map_err(SubmissionError::Start)?;
        self.store.set(Some(&submission.submission_id))?;
        info!(
            submission_id = %submission.submission_id,
            opportunity_id = %submission.opportunity_id,
            "submission started"
        );
        Ok(submission)
    }
}
