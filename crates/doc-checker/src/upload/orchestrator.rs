use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::file::UploadFile;
use super::progress::{ProgressTracker, TransferTicket};
use super::transfer::{FileTransfer, ProgressCallback, TransferError};
use crate::gateway::wire::{UploadGrant, UploadUrlRequest};
use crate::gateway::{DocCheckerApi, GatewayError};
use crate::status::{StatusReconciler, StatusView};
use crate::submission::{StoreError, SubmissionError, SubmissionId, SubmissionLifecycle};

/// How long a completed transfer keeps showing 100% before it is cleared.
pub const DEFAULT_PROGRESS_LINGER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub opportunity_id: String,
    pub requirement_id: String,
    pub file: UploadFile,
}

/// What happened to the status view after a successful transfer.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    Applied(Arc<StatusView>),
    /// The submission changed (e.g. a reset) while the transfer was in
    /// flight, so the upload's submission was not reconciled.
    Skipped { current: Option<SubmissionId> },
}

#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub requirement_id: String,
    pub submission_id: SubmissionId,
    pub key: Option<String>,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Descriptor(GatewayError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Reconcile(GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("upload for '{requirement_id}' did not finish: {reason}")]
    Interrupted {
        requirement_id: String,
        reason: String,
    },
}

/// Drives one file per call through descriptor issuance, transfer, and
/// reconciliation.
pub struct UploadOrchestrator {
    api: Arc<dyn DocCheckerApi>,
    transfer: Arc<dyn FileTransfer>,
    lifecycle: Arc<SubmissionLifecycle>,
    status: Arc<StatusReconciler>,
    progress: Arc<ProgressTracker>,
    linger: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        api: Arc<dyn DocCheckerApi>,
        transfer: Arc<dyn FileTransfer>,
        lifecycle: Arc<SubmissionLifecycle>,
        status: Arc<StatusReconciler>,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            api,
            transfer,
            lifecycle,
            status,
            progress,
            linger: DEFAULT_PROGRESS_LINGER,
        }
    }

    pub fn with_progress_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Uploads one file for one requirement.
    ///
    /// A submission is created first if none is stored. Progress for the
    /// requirement appears once the descriptor has been issued, ends at 100 on
    /// success and is cleared after the linger delay; on any failure it is
    /// cleared before this returns.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        let UploadRequest {
            opportunity_id,
            requirement_id,
            file,
        } = request;

        let submission_id = self.lifecycle.ensure_submission(&opportunity_id).await?;
        let grant = self
            .api
            .upload_url(&UploadUrlRequest {
                filename: file.filename().to_string(),
                content_type: file.effective_content_type().to_string(),
                submission_id,
                opportunity_id,
                requirement_id: requirement_id.clone(),
            })
            .await
            .map_err(UploadError::Descriptor)?;
        self.lifecycle.adopt(&grant.submission_id)?;

        let guard = ProgressGuard::claim(Arc::clone(&self.progress), &requirement_id);
        let receipt = self.transfer_and_reconcile(&guard, grant, &file).await?;
        guard.linger(self.linger);
        Ok(receipt)
    }

    /// Runs [`upload`](Self::upload) on its own task. Aborting the returned
    /// task clears the requirement's progress like any other failure.
    pub fn spawn(self: &Arc<Self>, request: UploadRequest) -> UploadTask {
        let orchestrator = Arc::clone(self);
        let requirement_id = request.requirement_id.clone();
        let handle = tokio::spawn(async move { orchestrator.upload(request).await });
        UploadTask {
            requirement_id,
            handle,
        }
    }

    async fn transfer_and_reconcile(
        &self,
        guard: &ProgressGuard,
        grant: UploadGrant,
        file: &UploadFile,
    ) -> Result<UploadReceipt, UploadError> {
        let UploadGrant {
            submission_id,
            key,
            upload,
            ..
        } = grant;
        let ticket = guard.ticket.clone();
        self.progress.advance(&ticket, 0);

        let reporter: ProgressCallback = {
            let progress = Arc::clone(&self.progress);
            let ticket = ticket.clone();
            Arc::new(move |percent| {
                progress.advance(&ticket, percent);
            })
        };
        self.transfer.send(upload, file, reporter).await?;
        self.progress.advance(&ticket, 100);
        info!(
            requirement_id = ticket.requirement_id(),
            %submission_id,
            bytes = file.len(),
            "transfer complete"
        );

        let current = self.lifecycle.current()?;
        let reconciliation = if current.as_ref() == Some(&submission_id) {
            let view = self
                .status
                .refresh(&submission_id)
                .await
                .map_err(UploadError::Reconcile)?;
            Reconciliation::Applied(view)
        } else {
            warn!(
                requirement_id = ticket.requirement_id(),
                uploaded_to = %submission_id,
                current = current.as_ref().map(SubmissionId::as_str).unwrap_or_default(),
                "submission changed during transfer; skipping reconciliation"
            );
            Reconciliation::Skipped { current }
        };

        Ok(UploadReceipt {
            requirement_id: ticket.requirement_id().to_string(),
            submission_id,
            key,
            reconciliation,
        })
    }
}

/// Clears a transfer's progress when dropped, unless the transfer finished and
/// handed the clearing over to the linger timer.
struct ProgressGuard {
    tracker: Arc<ProgressTracker>,
    ticket: TransferTicket,
    armed: bool,
}

impl ProgressGuard {
    fn claim(tracker: Arc<ProgressTracker>, requirement_id: &str) -> Self {
        let ticket = tracker.claim(requirement_id);
        Self {
            tracker,
            ticket,
            armed: true,
        }
    }

    fn linger(mut self, delay: Duration) {
        self.armed = false;
        let tracker = Arc::clone(&self.tracker);
        let ticket = self.ticket.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracker.clear(&ticket);
        });
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if self.armed {
            self.tracker.clear(&self.ticket);
        }
    }
}

/// An upload running on its own task.
#[derive(Debug)]
pub struct UploadTask {
    requirement_id: String,
    handle: JoinHandle<Result<UploadReceipt, UploadError>>,
}

impl UploadTask {
    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<UploadReceipt, UploadError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(UploadError::Interrupted {
                requirement_id: self.requirement_id,
                reason: err.to_string(),
            }),
        }
    }
}
