//! Remote backend configuration and wiring.
//!
//! The remote backend speaks plain REST: `/auth/v1` for identity,
//! `/rest/v1` for documents, `/storage/v1` for blobs. One bearer token
//! cell is shared across the three adapters; identity writes it, the
//! document and blob stores attach it to their requests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use finch_core::Backend;

use crate::blobs::RemoteBlobs;
use crate::docs::RemoteDocs;
use crate::identity::RemoteIdentity;

/// Remote backend configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL (e.g., http://localhost:8000)
    pub base_url: String,
    /// Project API key sent with every request.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How often document subscriptions poll for changes.
    pub poll_interval: Duration,
    /// Where the session is persisted across runs. `None` disables
    /// persistence.
    pub session_file: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(2000),
            session_file: None,
        }
    }
}

impl RemoteConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("FINCH_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_key: std::env::var("FINCH_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("FINCH_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            poll_interval: Duration::from_millis(
                std::env::var("FINCH_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            session_file: std::env::var("FINCH_SESSION_FILE").ok().map(PathBuf::from),
        }
    }
}

/// Bearer token shared by the adapters.
pub(crate) type TokenCell = Arc<RwLock<Option<String>>>;

/// Remote wiring errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("HTTP client setup failed: {0}")]
    Http(String),
}

/// Wire a complete remote backend from one configuration. Spawns the
/// session restore; callers should still gate on `wait_until_ready`.
pub fn connect(config: RemoteConfig) -> Result<Backend, ConnectError> {
    let http = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ConnectError::Http(e.to_string()))?;
    let token = TokenCell::default();

    let identity = RemoteIdentity::new(config.clone(), http.clone(), token.clone());
    let docs = RemoteDocs::new(config.clone(), http.clone(), token.clone());
    let blobs = RemoteBlobs::new(config.clone(), http, token);

    tracing::info!(base_url = %config.base_url, "Remote backend configured");
    Ok(Backend::new(
        Arc::new(identity),
        Arc::new(docs),
        Arc::new(blobs),
    ))
}
