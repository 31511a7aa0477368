//! Upload orchestration: descriptor issuance, byte transfer, progress, and the
//! follow-up status reconciliation.

mod file;
mod orchestrator;
mod progress;
mod transfer;

pub use file::{FileError, UploadFile, DEFAULT_CONTENT_TYPE};
pub use orchestrator::{
    Reconciliation, UploadError, UploadOrchestrator, UploadReceipt, UploadRequest, UploadTask,
    DEFAULT_PROGRESS_LINGER,
};
pub use progress::{ProgressEvent, ProgressTracker, TransferTicket};
pub use transfer::{FileTransfer, HttpTransfer, ProgressCallback, TransferError, UploadDescriptor};
