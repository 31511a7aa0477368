use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::{Body, Client, Method, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::file::UploadFile;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Single-use transfer parameters issued by the backend. Consumed by value so
/// a descriptor cannot be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "PUT".to_string()
}

/// Receives percentages in `0..=100` while a transfer is in flight.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("upload failed with status {status}")]
    Status { status: u16 },
    #[error("upload error: {0}")]
    Network(String),
    #[error("invalid upload descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Moves a file's bytes to wherever a descriptor points.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Sends `file` as described, reporting progress as bytes are handed to
    /// the transport. Reports 100 only once the destination accepted the file.
    ///
    /// The descriptor's method and headers go out verbatim. The one header an
    /// implementation may add is `Content-Length`, and only when the
    /// descriptor does not carry it: [`HttpTransfer`] does so to frame its
    /// streamed body.
    async fn send(
        &self,
        descriptor: UploadDescriptor,
        file: &UploadFile,
        progress: ProgressCallback,
    ) -> Result<(), TransferError>;
}

/// [`FileTransfer`] that streams the body over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    http: Client,
    chunk_size: usize,
}

impl HttpTransfer {
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|err| TransferError::Network(err.to_string()))?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl FileTransfer for HttpTransfer {
    async fn send(
        &self,
        descriptor: UploadDescriptor,
        file: &UploadFile,
        progress: ProgressCallback,
    ) -> Result<(), TransferError> {
        let method = Method::from_bytes(descriptor.method.trim().as_bytes())
            .map_err(|err| TransferError::InvalidDescriptor(format!("method: {err}")))?;
        let url = Url::parse(&descriptor.url)
            .map_err(|err| TransferError::InvalidDescriptor(format!("url: {err}")))?;
        let mut headers = descriptor_headers(&descriptor.headers)?;

        // Framing only: a streamed body would otherwise go out chunked, which
        // pre-signed object stores reject.
        if !headers.contains_key(CONTENT_LENGTH) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(file.len()));
        }

        progress(0);
        let body = progress_body(file.bytes().clone(), self.chunk_size, Arc::clone(&progress));
        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| TransferError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "upload destination rejected transfer");
            return Err(TransferError::Status {
                status: status.as_u16(),
            });
        }

        progress(100);
        Ok(())
    }
}

fn descriptor_headers(raw: &BTreeMap<String, String>) -> Result<HeaderMap, TransferError> {
    let mut headers = HeaderMap::new();
    for (name, value) in raw {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransferError::InvalidDescriptor(format!("header {name}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| TransferError::InvalidDescriptor(format!("header {name}: {err}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn progress_body(bytes: Bytes, chunk_size: usize, progress: ProgressCallback) -> Body {
    let total = bytes.len();
    if total == 0 {
        return Body::from(bytes);
    }

    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..total)
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(total)))
        .collect();

    let mut sent = 0usize;
    let stream = stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        progress(in_flight_percent(sent, total));
        Ok::<Bytes, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

/// Percentage of bytes handed off, held below 100 until the destination answers.
pub(crate) fn in_flight_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (sent.min(total) as u128 * 100) / total as u128;
    percent.min(99) as u8
}
