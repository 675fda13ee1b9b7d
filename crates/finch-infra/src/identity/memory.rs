//! In-memory identity provider.
//!
//! This is the default when no remote backend is configured.
//! Accounts live for the life of the process only.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use uuid::Uuid;

use finch_core::domain::{Session, UserId};
use finch_core::ports::{AuthError, IdentityProvider, MIN_PASSWORD_LEN, ProfileUpdate};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Sign-in throttle configuration.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Maximum sign-in attempts per window.
    pub max_attempts: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
        }
    }
}

struct Account {
    user_id: UserId,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
}

impl Account {
    fn session(&self) -> Session {
        Session {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// In-memory identity provider with argon2-hashed passwords and a
/// GCRA sign-in throttle.
///
/// Note: the throttle is global, not per-account.
pub struct MemoryIdentity {
    // Keyed by lowercased email.
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Session>>,
    argon2: Argon2<'static>,
    throttle: Arc<DirectRateLimiter>,
}

impl MemoryIdentity {
    pub fn new(config: ThrottleConfig) -> Self {
        let quota = Quota::with_period(config.window / config.max_attempts)
            .expect("Valid quota")
            .allow_burst(NonZeroU32::new(config.max_attempts).expect("Non-zero"));

        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            argon2: Argon2::default(),
            throttle: Arc::new(DirectRateLimiter::direct(quota)),
        }
    }

    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.len() < 3 || !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = normalize(email);
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }

        let account = Account {
            user_id: UserId(Uuid::new_v4().to_string()),
            email: email.trim().to_string(),
            password_hash: self.hash(password)?,
            display_name: Some(display_name.to_string()),
            avatar_url: None,
        };
        let session = account.session();
        accounts.insert(key, account);
        drop(accounts);

        // Signing up signs the new account in.
        *self.current.write().await = Some(session.clone());
        tracing::info!(user_id = %session.user_id, "Account registered");
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if self.throttle.check().is_err() {
            tracing::warn!("Sign-in throttled");
            return Err(AuthError::RateLimited);
        }

        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&normalize(email))
            .ok_or(AuthError::UserNotFound)?;
        if !self.verify(password, &account.password_hash)? {
            return Err(AuthError::WrongPassword);
        }
        let session = account.session();
        drop(accounts);

        *self.current.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.current.write().await = None;
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    // Sessions are process-local; there is nothing to restore.
    async fn wait_until_ready(&self) {}

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, AuthError> {
        let mut current = self.current.write().await;
        let session = current.as_ref().ok_or(AuthError::NotSignedIn)?;

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&normalize(&session.email))
            .ok_or(AuthError::UserNotFound)?;
        if let Some(name) = update.display_name {
            account.display_name = Some(name);
        }
        if let Some(url) = update.avatar_url {
            account.avatar_url = Some(url);
        }
        let session = account.session();
        drop(accounts);

        *current = Some(session.clone());
        Ok(session)
    }
}
