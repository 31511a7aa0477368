#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use doc_checker::gateway::wire::{UploadGrant, UploadUrlRequest};
use doc_checker::gateway::{DocCheckerApi, GatewayError};
use doc_checker::manifest::{Manifest, OpportunityEntry, OpportunitySummary, Requirement};
use doc_checker::status::{StatusEntry, StatusReport, ValidationStatus};
use doc_checker::submission::{MemorySubmissionStore, Submission, SubmissionId};
use doc_checker::upload::{
    FileTransfer, ProgressCallback, TransferError, UploadDescriptor, UploadFile,
};
use doc_checker::DocCheckerSession;
use tokio::sync::Notify;

pub const OPPORTUNITY: &str = "opp-001";
pub const BUDGET: &str = "budget-narrative";
pub const LETTERS: &str = "support-letters";

/// Holds a fake call open until the test releases it.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

pub fn requirement(id: &str, label: &str) -> Requirement {
    Requirement {
        id: id.to_string(),
        label: label.to_string(),
        filename_pattern: None,
        required: true,
        allowed_content_types: vec!["application/pdf".to_string()],
        max_size_mb: 25,
        max_pages: 50,
        required_sections: Vec::new(),
        notes: None,
    }
}

pub fn manifest(opportunity_id: &str, requirement_ids: &[&str]) -> Manifest {
    Manifest {
        opportunity_id: opportunity_id.to_string(),
        title: format!("Opportunity {opportunity_id}"),
        requirements: requirement_ids
            .iter()
            .map(|id| requirement(id, &id.replace('-', " ")))
            .collect(),
    }
}

pub fn entry(requirement_id: &str, filename: &str, status: ValidationStatus) -> StatusEntry {
    StatusEntry {
        requirement_id: requirement_id.to_string(),
        filename: Some(filename.to_string()),
        status,
        messages: Vec::new(),
    }
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, Some("application/pdf".to_string()), b"%PDF-1.7 test".to_vec())
}

#[derive(Debug, Default)]
pub struct Calls {
    pub manifest_index: usize,
    pub manifest: Vec<String>,
    pub start_submission: Vec<String>,
    pub upload_url: Vec<UploadUrlRequest>,
    pub status: Vec<SubmissionId>,
}

#[derive(Default)]
struct Script {
    index: OpportunitySummary,
    manifests: HashMap<String, Manifest>,
    manifest_failures: HashMap<String, GatewayError>,
    manifest_gates: HashMap<String, Arc<Gate>>,
    submission_ids: Vec<String>,
    start_failures: usize,
    start_gate: Option<Arc<Gate>>,
    upload_url_failure: Option<(u16, String)>,
    rotate_to: Option<SubmissionId>,
    descriptor_headers: BTreeMap<String, String>,
    statuses: HashMap<SubmissionId, Vec<StatusEntry>>,
    status_gate: Option<Arc<Gate>>,
    status_failure: Option<(u16, String)>,
}

/// Scripted in-memory backend. Every call is recorded.
#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.with_manifest(manifest(OPPORTUNITY, &[BUDGET, LETTERS]));
        backend.with_submission_ids(&["sub-123"]);
        Arc::new(backend)
    }

    pub fn with_manifest(&self, manifest: Manifest) {
        let mut script = self.script.lock().expect("script mutex");
        script.index.opportunities.insert(
            manifest.opportunity_id.clone(),
            OpportunityEntry {
                title: Some(manifest.title.clone()),
            },
        );
        script
            .manifests
            .insert(manifest.opportunity_id.clone(), manifest);
    }

    pub fn fail_manifest(&self, opportunity_id: &str, status: u16, body: &str) {
        self.script.lock().expect("script mutex").manifest_failures.insert(
            opportunity_id.to_string(),
            GatewayError::Request {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn gate_manifest(&self, opportunity_id: &str) -> Arc<Gate> {
        let gate = Gate::new();
        self.script
            .lock()
            .expect("script mutex")
            .manifest_gates
            .insert(opportunity_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Ids handed out by `start-submission`, in order. The last one repeats.
    pub fn with_submission_ids(&self, ids: &[&str]) {
        self.script.lock().expect("script mutex").submission_ids =
            ids.iter().map(|id| id.to_string()).collect();
    }

    pub fn fail_next_starts(&self, count: usize) {
        self.script.lock().expect("script mutex").start_failures = count;
    }

    pub fn gate_start(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.script.lock().expect("script mutex").start_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_upload_url(&self, status: u16, body: &str) {
        self.script.lock().expect("script mutex").upload_url_failure =
            Some((status, body.to_string()));
    }

    pub fn rotate_submission_to(&self, submission_id: &str) {
        self.script.lock().expect("script mutex").rotate_to = Some(SubmissionId::from(submission_id));
    }

    pub fn with_descriptor_header(&self, name: &str, value: &str) {
        self.script
            .lock()
            .expect("script mutex")
            .descriptor_headers
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_status(&self, submission_id: &str, files: Vec<StatusEntry>) {
        self.script
            .lock()
            .expect("script mutex")
            .statuses
            .insert(SubmissionId::from(submission_id), files);
    }

    pub fn fail_status(&self, status: u16, body: &str) {
        self.script.lock().expect("script mutex").status_failure =
            Some((status, body.to_string()));
    }

    pub fn gate_status(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.script.lock().expect("script mutex").status_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().expect("calls mutex")
    }
}

#[async_trait]
impl DocCheckerApi for FakeBackend {
    async fn manifest_index(&self) -> Result<OpportunitySummary, GatewayError> {
        self.calls().manifest_index += 1;
        Ok(self.script.lock().expect("script mutex").index.clone())
    }

    async fn manifest(&self, opportunity_id: &str) -> Result<Manifest, GatewayError> {
        self.calls().manifest.push(opportunity_id.to_string());
        let (result, gate) = {
            let mut script = self.script.lock().expect("script mutex");
            let result = match script.manifest_failures.remove(opportunity_id) {
                Some(err) => Err(err),
                None => script.manifests.get(opportunity_id).cloned().ok_or_else(|| {
                    GatewayError::Request {
                        status: 404,
                        body: "Unknown opportunity".to_string(),
                    }
                }),
            };
            (result, script.manifest_gates.remove(opportunity_id))
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
        result
    }

    async fn start_submission(&self, opportunity_id: &str) -> Result<Submission, GatewayError> {
        let (result, gate) = {
            let mut script = self.script.lock().expect("script mutex");
            let result = if script.start_failures > 0 {
                script.start_failures -= 1;
                Err(GatewayError::Request {
                    status: 503,
                    body: "Service Unavailable".to_string(),
                })
            } else {
                let id = if script.submission_ids.len() > 1 {
                    script.submission_ids.remove(0)
                } else {
                    script
                        .submission_ids
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "sub-default".to_string())
                };
                Ok(Submission {
                    submission_id: SubmissionId::from(id),
                    opportunity_id: opportunity_id.to_string(),
                })
            };
            (result, script.start_gate.take())
        };
        self.calls()
            .start_submission
            .push(opportunity_id.to_string());
        if let Some(gate) = gate {
            gate.pass().await;
        }
        result
    }

    async fn upload_url(&self, request: &UploadUrlRequest) -> Result<UploadGrant, GatewayError> {
        self.calls().upload_url.push(request.clone());
        let script = self.script.lock().expect("script mutex");
        if let Some((status, body)) = &script.upload_url_failure {
            return Err(GatewayError::Request {
                status: *status,
                body: body.clone(),
            });
        }

        let submission_id = script
            .rotate_to
            .clone()
            .unwrap_or_else(|| request.submission_id.clone());
        let key = format!(
            "{}/{}/{}",
            submission_id, request.requirement_id, request.filename
        );
        Ok(UploadGrant {
            submission_id,
            requirement_id: Some(request.requirement_id.clone()),
            key: Some(key.clone()),
            upload: UploadDescriptor {
                url: format!("https://uploads.example.test/{key}"),
                method: "PUT".to_string(),
                headers: script.descriptor_headers.clone(),
            },
        })
    }

    async fn status(&self, submission_id: &SubmissionId) -> Result<StatusReport, GatewayError> {
        self.calls().status.push(submission_id.clone());
        let (files, gate, failure) = {
            let mut script = self.script.lock().expect("script mutex");
            (
                script
                    .statuses
                    .get(submission_id)
                    .cloned()
                    .unwrap_or_default(),
                script.status_gate.take(),
                script.status_failure.clone(),
            )
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if let Some((status, body)) = failure {
            return Err(GatewayError::Request { status, body });
        }
        Ok(StatusReport {
            submission_id: submission_id.clone(),
            opportunity_id: Some(OPPORTUNITY.to_string()),
            overall: ValidationStatus::Pending,
            files,
            updated_at: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SentFile {
    pub descriptor: UploadDescriptor,
    pub filename: String,
    pub content_type: String,
    pub len: usize,
}

#[derive(Default)]
struct TransferScript {
    steps: Vec<u8>,
    failure: Option<u16>,
    gates: Vec<Arc<Gate>>,
}

/// Transfer double that reports scripted progress steps instead of moving
/// bytes.
#[derive(Default)]
pub struct FakeTransfer {
    script: Mutex<TransferScript>,
    sent: Mutex<Vec<SentFile>>,
}

impl FakeTransfer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_steps(&self, steps: &[u8]) {
        self.script.lock().expect("transfer mutex").steps = steps.to_vec();
    }

    pub fn fail_with_status(&self, status: u16) {
        self.script.lock().expect("transfer mutex").failure = Some(status);
    }

    /// Holds the next transfer open after its progress steps have been
    /// reported. Gates queue up, one per transfer.
    pub fn gate_next(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.script
            .lock()
            .expect("transfer mutex")
            .gates
            .push(Arc::clone(&gate));
        gate
    }

    pub fn sent(&self) -> Vec<SentFile> {
        self.sent.lock().expect("sent mutex").clone()
    }
}

#[async_trait]
impl FileTransfer for FakeTransfer {
    async fn send(
        &self,
        descriptor: UploadDescriptor,
        file: &UploadFile,
        progress: ProgressCallback,
    ) -> Result<(), TransferError> {
        let (steps, failure, gate) = {
            let mut script = self.script.lock().expect("transfer mutex");
            let gate = (!script.gates.is_empty()).then(|| script.gates.remove(0));
            (script.steps.clone(), script.failure, gate)
        };
        self.sent.lock().expect("sent mutex").push(SentFile {
            descriptor,
            filename: file.filename().to_string(),
            content_type: file.effective_content_type().to_string(),
            len: file.len(),
        });

        for step in steps {
            progress(step);
            tokio::task::yield_now().await;
        }
        if let Some(gate) = gate {
            gate.pass().await;
        }
        match failure {
            Some(status) => Err(TransferError::Status { status }),
            None => Ok(()),
        }
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub transfer: Arc<FakeTransfer>,
    pub store: Arc<MemorySubmissionStore>,
    pub session: DocCheckerSession,
}

pub const LINGER: Duration = Duration::from_millis(1500);

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemorySubmissionStore::default())
    }

    pub fn with_stored_id(submission_id: &str) -> Self {
        Self::with_store(MemorySubmissionStore::with_id(submission_id))
    }

    fn with_store(store: MemorySubmissionStore) -> Self {
        let backend = FakeBackend::new();
        let transfer = FakeTransfer::new();
        let store = Arc::new(store);
        let session = DocCheckerSession::with_progress_linger(
            backend.clone(),
            transfer.clone(),
            store.clone(),
            LINGER,
        );
        Self {
            backend,
            transfer,
            store,
            session,
        }
    }
}
