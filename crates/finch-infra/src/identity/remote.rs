//! Remote identity provider.
//!
//! Auth endpoints follow the common hosted-backend shape:
//! `POST /auth/v1/signup`, `POST /auth/v1/token?grant_type=password`,
//! `GET`/`PUT /auth/v1/user`, `POST /auth/v1/logout`. The session and
//! its token are persisted to a local file and revalidated on startup.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{RwLock, watch};

use finch_core::domain::{Session, UserId};
use finch_core::ports::{AuthError, IdentityProvider, ProfileUpdate};

use crate::remote::{RemoteConfig, TokenCell};

/// Session state as held in memory and persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAuth {
    access_token: String,
    session: Session,
}

/// Identity provider backed by the remote auth API.
pub struct RemoteIdentity {
    config: RemoteConfig,
    http: reqwest::Client,
    state: Arc<RwLock<Option<StoredAuth>>>,
    token: TokenCell,
    ready: watch::Receiver<bool>,
}

impl RemoteIdentity {
    /// Build the provider and start the session restore in the
    /// background. `wait_until_ready` resolves once it settles.
    pub fn new(config: RemoteConfig, http: reqwest::Client, token: TokenCell) -> Self {
        let state = Arc::new(RwLock::new(None));
        let (ready_tx, ready_rx) = watch::channel(false);

        let restore_config = config.clone();
        let restore_http = http.clone();
        let restore_state = state.clone();
        let restore_token = token.clone();
        tokio::spawn(async move {
            restore_session(&restore_config, &restore_http, &restore_state, &restore_token).await;
            let _ = ready_tx.send(true);
        });

        Self {
            config,
            http,
            state,
            token,
            ready: ready_rx,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    /// Accept a token-bearing response: store the session, share the
    /// bearer token, persist to disk.
    async fn accept_token_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Session, AuthError> {
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(map_auth_failure(status, &body));
        }

        let granted: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Provider(e.to_string()))?;
        let session = granted.user.into_session();

        *self.token.write().await = Some(granted.access_token.clone());
        *self.state.write().await = Some(StoredAuth {
            access_token: granted.access_token,
            session: session.clone(),
        });
        self.persist().await;
        Ok(session)
    }

    /// Write the current state to the session file, or remove the file
    /// when signed out. Persistence failures are logged, not returned.
    async fn persist(&self) {
        let Some(path) = &self.config.session_file else {
            return;
        };
        let state = self.state.read().await;
        let result = match state.as_ref() {
            Some(stored) => match serde_json::to_string(stored) {
                Ok(contents) => tokio::fs::write(path, contents).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Session serialize failed");
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Session file write failed");
        }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let payload = json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        });
        let response = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(net_err)?;
        let session = self.accept_token_response(response).await?;
        tracing::info!(user_id = %session.user_id, "Account registered");
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let payload = json!({ "email": email, "password": password });
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(net_err)?;
        self.accept_token_response(response).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.token.read().await.clone();
        if let Some(token) = token {
            let result = self
                .http
                .post(self.endpoint("logout"))
                .header("apikey", &self.config.api_key)
                .bearer_auth(&token)
                .send()
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "Remote logout failed; clearing local session anyway");
            }
        }

        *self.token.write().await = None;
        *self.state.write().await = None;
        self.persist().await;
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.state.read().await.as_ref().map(|s| s.session.clone())
    }

    async fn wait_until_ready(&self) {
        let mut ready = self.ready.clone();
        if *ready.borrow() {
            return;
        }
        // A dropped sender counts as settled.
        let _ = ready.wait_for(|settled| *settled).await;
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, AuthError> {
        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotSignedIn)?;

        let mut data = serde_json::Map::new();
        if let Some(name) = update.display_name {
            data.insert("display_name".to_string(), json!(name));
        }
        if let Some(url) = update.avatar_url {
            data.insert("avatar_url".to_string(), json!(url));
        }

        let response = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&token)
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(net_err)?;
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(map_auth_failure(status, &body));
        }

        let user: RemoteUser =
            serde_json::from_str(&body).map_err(|e| AuthError::Provider(e.to_string()))?;
        let session = user.into_session();

        let mut state = self.state.write().await;
        if let Some(stored) = state.as_mut() {
            stored.session = session.clone();
        }
        drop(state);
        self.persist().await;

        tracing::info!(user_id = %session.user_id, "Profile updated");
        Ok(session)
    }
}

/// Try to bring a persisted session back, revalidating its token
/// against the server. A rejected token removes the file.
async fn restore_session(
    config: &RemoteConfig,
    http: &reqwest::Client,
    state: &RwLock<Option<StoredAuth>>,
    token: &TokenCell,
) {
    let Some(path) = &config.session_file else {
        return;
    };
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => return,
    };
    let stored: StoredAuth = match serde_json::from_str(&raw) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable session file");
            return;
        }
    };

    match fetch_user(config, http, &stored.access_token).await {
        Ok(session) => {
            *token.write().await = Some(stored.access_token.clone());
            *state.write().await = Some(StoredAuth {
                access_token: stored.access_token,
                session,
            });
            tracing::info!("Session restored");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stored session rejected; starting signed out");
            let _ = tokio::fs::remove_file(path).await;
        }
    }
}

async fn fetch_user(
    config: &RemoteConfig,
    http: &reqwest::Client,
    token: &str,
) -> Result<Session, AuthError> {
    let response = http
        .get(format!("{}/auth/v1/user", config.base_url))
        .header("apikey", &config.api_key)
        .bearer_auth(token)
        .send()
        .await
        .map_err(net_err)?;
    let status = response.status();
    let body = response.text().await.map_err(net_err)?;
    if !status.is_success() {
        return Err(map_auth_failure(status, &body));
    }

    let user: RemoteUser =
        serde_json::from_str(&body).map_err(|e| AuthError::Provider(e.to_string()))?;
    Ok(user.into_session())
}

fn net_err(e: reqwest::Error) -> AuthError {
    AuthError::Network(e.to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl RemoteUser {
    fn into_session(self) -> Session {
        Session {
            user_id: UserId(self.id),
            email: self.email,
            display_name: self.user_metadata.display_name,
            avatar_url: self.user_metadata.avatar_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Map an auth failure to the user-facing error kinds. Unknown codes
/// fall through to `Provider` with whatever message the server gave.
fn map_auth_failure(status: StatusCode, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.or(parsed.error).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .unwrap_or_else(|| format!("status {status}"));

    match code.as_str() {
        "email_address_invalid" | "validation_failed" => AuthError::InvalidEmail,
        "email_exists" | "user_already_exists" => AuthError::EmailInUse,
        "user_not_found" => AuthError::UserNotFound,
        "invalid_credentials" | "invalid_grant" => AuthError::InvalidCredentials,
        "weak_password" => AuthError::WeakPassword,
        "user_banned" => AuthError::UserDisabled,
        "over_request_rate_limit" => AuthError::RateLimited,
        _ if status == StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
        _ => AuthError::Provider(message),
    }
}
