use async_trait::async_trait;
use tracing::debug;

use super::client::{GatewayError, RemoteGateway};
use super::wire::{StartSubmissionRequest, StartSubmissionResponse, UploadGrant, UploadUrlRequest};
use crate::manifest::{Manifest, OpportunitySummary};
use crate::status::StatusReport;
use crate::submission::{Submission, SubmissionId};

/// The backend operations the client core consumes.
#[async_trait]
pub trait DocCheckerApi: Send + Sync {
    async fn manifest_index(&self) -> Result<OpportunitySummary, GatewayError>;

    async fn manifest(&self, opportunity_id: &str) -> Result<Manifest, GatewayError>;

    async fn start_submission(&self, opportunity_id: &str) -> Result<Submission, GatewayError>;

    async fn upload_url(&self, request: &UploadUrlRequest) -> Result<UploadGrant, GatewayError>;

    async fn status(&self, submission_id: &SubmissionId) -> Result<StatusReport, GatewayError>;
}

/// [`DocCheckerApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    gateway: RemoteGateway,
}

impl HttpBackend {
    pub fn new(gateway: RemoteGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DocCheckerApi for HttpBackend {
    async fn manifest_index(&self) -> Result<OpportunitySummary, GatewayError> {
        self.gateway.get(&["manifest", "index"], &[]).await
    }

    async fn manifest(&self, opportunity_id: &str) -> Result<Manifest, GatewayError> {
        self.gateway
            .get(&["manifest"], &[("opportunity_id", opportunity_id)])
            .await
    }

    async fn start_submission(&self, opportunity_id: &str) -> Result<Submission, GatewayError> {
        let request = StartSubmissionRequest {
            opportunity_id: opportunity_id.to_string(),
        };
        let response: StartSubmissionResponse =
            self.gateway.post(&["start-submission"], &request).await?;
        debug!(submission_id = %response.submission_id, "backend issued submission");

        Ok(Submission {
            submission_id: response.submission_id,
            opportunity_id: response
                .opportunity_id
                .unwrap_or_else(|| opportunity_id.to_string()),
        })
    }

    async fn upload_url(&self, request: &UploadUrlRequest) -> Result<UploadGrant, GatewayError> {
        self.gateway.post(&["upload-url"], request).await
    }

    async fn status(&self, submission_id: &SubmissionId) -> Result<StatusReport, GatewayError> {
        self.gateway
            .get(&["status", submission_id.as_str()], &[])
            .await
    }
}
