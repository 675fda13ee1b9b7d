//! Session gate and the sign-in / sign-up flows.

use std::sync::Arc;

use crate::context::Backend;
use crate::domain::Session;
use crate::error::{Error, ValidationError};
use crate::ports::IdentityProvider;

/// Guards everything behind the sign-in wall.
pub struct SessionGate {
    identity: Arc<dyn IdentityProvider>,
}

impl SessionGate {
    pub fn new(backend: &Backend) -> Self {
        Self {
            identity: backend.identity.clone(),
        }
    }

    /// Block until the provider has settled its initial session
    /// restore. Nothing gated should run before this returns.
    pub async fn wait_until_ready(&self) {
        self.identity.wait_until_ready().await;
    }

    pub async fn current(&self) -> Option<Session> {
        self.identity.current_session().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current().await.is_some()
    }

    /// Current session, or `Error::SignedOut` for unauthenticated callers.
    pub async fn require(&self) -> Result<Session, Error> {
        self.current().await.ok_or(Error::SignedOut)
    }

    /// Sign an existing user in. Empty fields are rejected before the
    /// provider is contacted.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        let session = self.identity.sign_in(email, password).await?;
        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Create an account and sign it in. Empty fields are rejected
    /// before the provider is contacted.
    pub async fn sign_up(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, Error> {
        if display_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        let session = self.identity.sign_up(email, password, display_name).await?;
        tracing::info!(user_id = %session.user_id, "Account created");
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<(), Error> {
        self.identity.sign_out().await?;
        tracing::info!("Signed out");
        Ok(())
    }
}
