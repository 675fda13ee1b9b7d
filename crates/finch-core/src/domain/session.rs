use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the identity backend assigns to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Session entity - the signed-in user as the client sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Session {
    /// Name stamped onto new posts, with the fallback the feed shows
    /// for accounts that never set one.
    pub fn author_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => "Anonymous".to_string(),
        }
    }

    /// Storage path of this user's avatar. One slot per user; a new
    /// upload replaces the old object in place.
    pub fn avatar_path(&self) -> String {
        format!("avatars/{}", self.user_id)
    }
}
