use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::warn;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::gateway::{DocCheckerApi, GatewayError, HttpBackend, RemoteGateway};
use crate::manifest::{Manifest, ManifestLoader, ManifestUpdate, OpportunitySummary};
use crate::status::{StatusReconciler, StatusView};
use crate::submission::{
    FileSubmissionStore, StoreError, Submission, SubmissionError, SubmissionId,
    SubmissionLifecycle, SubmissionStore,
};
use crate::upload::{
    FileTransfer, HttpTransfer, ProgressTracker, UploadError, UploadFile, UploadOrchestrator,
    UploadReceipt, UploadRequest, DEFAULT_PROGRESS_LINGER,
};
use crate::view::{build_view, RequirementView};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no opportunity selected")]
    NoOpportunitySelected,
}

/// One applicant's working session: the selected opportunity, its manifest,
/// the active submission, and the latest status, plus the single error slot
/// every failing operation reports into (last error wins).
pub struct DocCheckerSession {
    manifests: ManifestLoader,
    lifecycle: Arc<SubmissionLifecycle>,
    status: Arc<StatusReconciler>,
    uploads: Arc<UploadOrchestrator>,
    progress: Arc<ProgressTracker>,
    last_error: Mutex<Option<String>>,
}

impl DocCheckerSession {
    pub fn new(
        api: Arc<dyn DocCheckerApi>,
        transfer: Arc<dyn FileTransfer>,
        store: Arc<dyn SubmissionStore>,
    ) -> Self {
        Self::with_progress_linger(api, transfer, store, DEFAULT_PROGRESS_LINGER)
    }

    pub fn with_progress_linger(
        api: Arc<dyn DocCheckerApi>,
        transfer: Arc<dyn FileTransfer>,
        store: Arc<dyn SubmissionStore>,
        linger: Duration,
    ) -> Self {
        let status = Arc::new(StatusReconciler::new(Arc::clone(&api)));
        let lifecycle = Arc::new(SubmissionLifecycle::new(
            Arc::clone(&api),
            store,
            Arc::clone(&status),
        ));
        let progress = Arc::new(ProgressTracker::new());
        let uploads = Arc::new(
            UploadOrchestrator::new(
                Arc::clone(&api),
                transfer,
                Arc::clone(&lifecycle),
                Arc::clone(&status),
                Arc::clone(&progress),
            )
            .with_progress_linger(linger),
        );

        Self {
            manifests: ManifestLoader::new(api),
            lifecycle,
            status,
            uploads,
            progress,
            last_error: Mutex::new(None),
        }
    }

    /// Session talking HTTP to the configured backend with the submission id
    /// persisted under the configured state directory.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let gateway = RemoteGateway::new(
            config.backend.base_url.clone(),
            config.backend.request_timeout,
        )?;
        let transfer = HttpTransfer::new(config.backend.request_timeout)?;
        let store = FileSubmissionStore::new(config.storage.submission_file());

        Ok(Self::with_progress_linger(
            Arc::new(HttpBackend::new(gateway)),
            Arc::new(transfer),
            Arc::new(store),
            config.uploads.progress_linger,
        ))
    }

    pub async fn load_index(&self) -> Result<Arc<OpportunitySummary>, SessionError> {
        let result = self.manifests.load_index().await.map_err(SessionError::from);
        self.record(result)
    }

    /// Makes `opportunity_id` the selected opportunity and loads its manifest.
    /// The stored submission is left alone.
    pub async fn select_opportunity(
        &self,
        opportunity_id: &str,
    ) -> Result<ManifestUpdate, SessionError> {
        self.clear_error();
        let result = self
            .manifests
            .load_manifest(opportunity_id)
            .await
            .map_err(SessionError::from);
        self.record(result)
    }

    pub fn selected_opportunity(&self) -> Option<String> {
        self.manifests.selected()
    }

    pub fn manifest(&self) -> Option<Arc<Manifest>> {
        self.manifests.current()
    }

    pub fn opportunities(&self) -> Option<Arc<OpportunitySummary>> {
        self.manifests.index()
    }

    pub fn submission_id(&self) -> Result<Option<SubmissionId>, SessionError> {
        let result = self.lifecycle.current().map_err(SessionError::from);
        self.record(result)
    }

    /// Refreshes status for a submission persisted by an earlier run, if any.
    pub async fn resume(&self) -> Result<Option<Arc<StatusView>>, SessionError> {
        self.refresh_status().await
    }

    /// Starts a new submission for the selected opportunity and loads its
    /// (empty) status.
    pub async fn start_submission(&self) -> Result<Submission, SessionError> {
        let result = async {
            let opportunity_id = self.require_selection()?;
            let submission = self.lifecycle.start(&opportunity_id).await?;
            self.status.refresh(&submission.submission_id).await?;
            Ok::<_, SessionError>(submission)
        }
        .await;
        self.record(result)
    }

    pub async fn upload(
        &self,
        requirement_id: &str,
        file: UploadFile,
    ) -> Result<UploadReceipt, SessionError> {
        self.clear_error();
        let result = async {
            let opportunity_id = self.require_selection()?;
            let receipt = self
                .uploads
                .upload(UploadRequest {
                    opportunity_id,
                    requirement_id: requirement_id.to_string(),
                    file,
                })
                .await?;
            Ok::<_, SessionError>(receipt)
        }
        .await;
        self.record(result)
    }

    /// Re-fetches status for the current submission. `None` when no submission
    /// exists yet.
    pub async fn refresh_status(&self) -> Result<Option<Arc<StatusView>>, SessionError> {
        let result = async {
            let Some(submission_id) = self.lifecycle.current()? else {
                return Ok(None);
            };
            let view = self.status.refresh(&submission_id).await?;
            Ok::<_, SessionError>(Some(view))
        }
        .await;
        self.record(result)
    }

    pub fn reset(&self) -> Result<(), SessionError> {
        let result = self.lifecycle.reset().map_err(SessionError::from);
        self.record(result)
    }

    pub fn status(&self) -> Option<Arc<StatusView>> {
        self.status.current()
    }

    /// Current view of every requirement of the loaded manifest.
    pub fn view(&self) -> Vec<RequirementView> {
        let Some(manifest) = self.manifests.current() else {
            return Vec::new();
        };
        let status = self.status.current();
        build_view(&manifest, status.as_deref(), &self.progress.snapshot())
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    pub fn uploads(&self) -> &Arc<UploadOrchestrator> {
        &self.uploads
    }

    pub fn last_error(&self) -> Option<String> {
        self.error_slot().clone()
    }

    pub fn clear_error(&self) {
        *self.error_slot() = None;
    }

    fn require_selection(&self) -> Result<String, SessionError> {
        self.manifests
            .selected()
            .ok_or(SessionError::NoOpportunitySelected)
    }

    fn record<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(err) = &result {
            warn!(error = %err, "operation failed");
            *self.error_slot() = Some(err.to_string());
        }
        result
    }

    fn error_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
