//! Post entity and its document mapping.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::domain::session::{Session, UserId};
use crate::error::ValidationError;

/// Collection that holds every post document.
pub const COLLECTION: &str = "posts";

/// Maximum post length, in characters.
pub const MAX_TEXT_LEN: usize = 200;

/// Document field names.
pub mod field {
    pub const AUTHOR_ID: &str = "author_id";
    pub const AUTHOR_NAME: &str = "author_name";
    pub const TEXT: &str = "text";
    pub const PHOTO_URL: &str = "photo_url";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Identifier the document store assigns to a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Post entity - one entry in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub text: String,
    pub photo_url: Option<String>,
    /// Milliseconds since the Unix epoch, stamped by the client.
    pub created_at: i64,
    /// Set on the first successful edit; absent until then.
    pub updated_at: Option<i64>,
}

impl Post {
    /// Storage path of this post's photo. The path is fixed per post,
    /// so a replacement upload lands on the same object.
    pub fn photo_path(&self) -> String {
        photo_path(&self.author_id, &self.id)
    }

    /// Decode a post from a stored document.
    pub fn from_fields(id: &str, fields: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let body: PostFields = serde_json::from_value(Value::Object(fields.clone()))?;
        Ok(Self {
            id: PostId::from(id),
            author_id: body.author_id,
            author_name: body.author_name,
            text: body.text,
            photo_url: body.photo_url,
            created_at: body.created_at,
            updated_at: body.updated_at,
        })
    }

    /// Document written when a post is first created. The photo slot is
    /// an explicit null until an upload fills it in.
    pub fn creation_fields(author: &Session, text: &str, created_at: i64) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(field::AUTHOR_ID.into(), json!(author.user_id));
        fields.insert(field::AUTHOR_NAME.into(), json!(author.author_name()));
        fields.insert(field::TEXT.into(), json!(text));
        fields.insert(field::PHOTO_URL.into(), Value::Null);
        fields.insert(field::CREATED_AT.into(), json!(created_at));
        fields
    }
}

/// Storage path of a post's photo, derivable before the `Post` exists.
pub fn photo_path(author: &UserId, post: &PostId) -> String {
    format!("posts/{author}/{post}")
}

/// Wire shape of a post document, minus the externally held id.
#[derive(Debug, Deserialize)]
struct PostFields {
    author_id: UserId,
    author_name: String,
    text: String,
    #[serde(default)]
    photo_url: Option<String>,
    created_at: i64,
    #[serde(default)]
    updated_at: Option<i64>,
}

/// What to do with the photo slot when committing an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoField {
    /// Leave the stored value untouched.
    Keep,
    /// Point the slot at a freshly uploaded photo.
    Set(String),
    /// Null the slot out.
    Clear,
}

/// Partial document written when committing an edit. A null photo is an
/// assignment, not an omission: the stored slot becomes null.
#[derive(Debug, Clone, PartialEq)]
pub struct PostUpdate {
    pub text: String,
    pub photo: PhotoField,
    pub updated_at: i64,
}

impl PostUpdate {
    pub fn into_fields(self) -> Map<String, Value> {
        let mut patch = Map::new();
        patch.insert(field::TEXT.into(), json!(self.text));
        match self.photo {
            PhotoField::Keep => {}
            PhotoField::Set(url) => {
                patch.insert(field::PHOTO_URL.into(), json!(url));
            }
            PhotoField::Clear => {
                patch.insert(field::PHOTO_URL.into(), Value::Null);
            }
        }
        patch.insert(field::UPDATED_AT.into(), json!(self.updated_at));
        patch
    }
}

/// Check text for a new post. Composing requires non-empty text.
pub fn validate_compose_text(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    check_len(text)
}

/// Check an edit draft. Text may go empty as long as a photo stays attached.
pub fn validate_edit(text: &str, has_photo: bool) -> Result<(), ValidationError> {
    if text.is_empty() && !has_photo {
        return Err(ValidationError::EmptyPost);
    }
    check_len(text)
}

fn check_len(text: &str) -> Result<(), ValidationError> {
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TextTooLong { max: MAX_TEXT_LEN });
    }
    Ok(())
}
