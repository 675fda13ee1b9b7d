//! Identity port - abstraction over the authentication backend.

use async_trait::async_trait;

use crate::domain::Session;

/// Shortest password any identity backend accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Partial profile change. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Identity trait - session lifecycle and profile data live behind it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// End the current session. Signing out while signed out is a no-op.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The session as of now, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Resolve once the provider has settled its initial session
    /// restore. Before that, `current_session` may transiently report
    /// no session for a user who is actually signed in.
    async fn wait_until_ready(&self);

    /// Apply a profile change to the signed-in user and return the
    /// refreshed session.
    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, AuthError>;
}

/// Authentication errors. Display strings are the user-facing messages
/// the screens show verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("The email address is not valid")]
    InvalidEmail,

    #[error("An account with this email already exists")]
    EmailInUse,

    #[error("No account exists for this email")]
    UserNotFound,

    #[error("The password is wrong")]
    WrongPassword,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("The password is too weak")]
    WeakPassword,

    #[error("This account has been disabled")]
    UserDisabled,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Provider(String),
}
