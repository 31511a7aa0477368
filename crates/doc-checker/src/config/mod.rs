use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::submission::STORAGE_KEY;
use crate::upload::DEFAULT_PROGRESS_LINGER;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STATE_DIR_NAME: &str = "grant-doc-checker";

/// Distinguishes runtime behavior for different stages of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let raw_base = env::var("DOC_CHECKER_API").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let base_url = parse_base_url(&raw_base)?;

        let state_dir = match env::var("DOC_CHECKER_STATE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => default_state_dir(),
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            backend: BackendConfig {
                base_url,
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
            storage: StorageConfig { state_dir },
            uploads: UploadConfig {
                progress_linger: DEFAULT_PROGRESS_LINGER,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Location and timeouts for the document checker backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
}

/// Where durable client state lives between runs.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub state_dir: PathBuf,
}

impl StorageConfig {
    pub fn submission_file(&self) -> PathBuf {
        self.state_dir.join(STORAGE_KEY)
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// How long a finished transfer keeps showing 100% before it is cleared.
    pub progress_linger: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{STATE_DIR_NAME}")))
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidBaseUrl {
        value: trimmed.to_string(),
        reason: err.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: "expected an absolute http(s) URL".to_string(),
        });
    }

    Ok(url)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBaseUrl { value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl { value, reason } => {
                write!(f, "DOC_CHECKER_API '{value}' is not a usable base URL: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
