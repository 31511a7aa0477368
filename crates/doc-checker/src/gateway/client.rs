use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Failure raised for any backend request that does not yield a usable body.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {status} {body}")]
    Request { status: u16, body: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("cannot build backend url for '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl GatewayError {
    /// HTTP status of a rejected request, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteGateway {
    http: Client,
    base_url: Url,
}

impl RemoteGateway {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        self.request::<(), T>(Method::GET, segments, query, None).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, segments, &[], Some(body)).await
    }

    /// Issues one request and decodes a JSON body. Path segments are
    /// percent-encoded individually and appended to the base URL's own path.
    pub async fn request<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let mut builder = self.http.request(method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%method, path = %segments.join("/"), status = status.as_u16(), "backend rejected request");
            return Err(GatewayError::Request {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidPath {
                path: segments.join("/"),
                reason: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
