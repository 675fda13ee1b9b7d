//! Edit draft - photo intents and their reduction to one submit plan.

use crate::domain::post::Post;

/// A file picked from the local machine, not yet uploaded anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Placeholder URL shown while the file is only local. Never equal
    /// to a stored photo URL, which keeps the draft reduction honest.
    pub fn preview_url(&self) -> String {
        format!("local://{}", self.name)
    }
}

/// Working state of one post's edit screen.
///
/// Three facts determine what submit will do: whether a new file is
/// selected, which photo the draft currently displays, and which photo
/// the stored post had when the editor opened.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    text: String,
    selected: Option<LocalFile>,
    displayed_photo: Option<String>,
    original_photo: Option<String>,
}

impl EditDraft {
    /// Seed a draft from the stored post.
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            selected: None,
            displayed_photo: post.photo_url.clone(),
            original_photo: post.photo_url.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn displayed_photo(&self) -> Option<&str> {
        self.displayed_photo.as_deref()
    }

    /// True when submit would leave the post with any photo at all.
    pub fn has_photo(&self) -> bool {
        self.selected.is_some() || self.displayed_photo.is_some()
    }

    /// Stage a replacement photo. Its preview takes over the display slot.
    pub fn select_photo(&mut self, file: LocalFile) {
        self.displayed_photo = Some(file.preview_url());
        self.selected = Some(file);
    }

    /// Drop whatever photo is staged or displayed.
    pub fn remove_photo(&mut self) {
        self.selected = None;
        self.displayed_photo = None;
    }

    /// Put the stored post's photo back and discard any selected file.
    pub fn restore_photo(&mut self) {
        self.selected = None;
        self.displayed_photo = self.original_photo.clone();
    }

    /// Reduce the draft to the single plan submit will execute.
    pub fn photo_plan(&self) -> PhotoPlan {
        match (&self.selected, &self.displayed_photo) {
            (Some(file), _) => PhotoPlan::Replace {
                file: file.clone(),
                delete_original: self.original_photo.is_some(),
            },
            (None, None) => {
                if self.original_photo.is_some() {
                    PhotoPlan::Remove
                } else {
                    PhotoPlan::TextOnly
                }
            }
            (None, Some(displayed)) => {
                if self.original_photo.as_deref() == Some(displayed.as_str()) {
                    PhotoPlan::TextOnly
                } else {
                    PhotoPlan::Inconsistent
                }
            }
        }
    }
}

/// The four ways a submit can treat the photo slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoPlan {
    /// Upload the selected file over the post's photo path, deleting the
    /// old object first when one exists.
    Replace {
        file: LocalFile,
        delete_original: bool,
    },
    /// Delete the stored object and null the document's photo slot.
    Remove,
    /// Touch only the text; the stored photo slot is left alone.
    TextOnly,
    /// Displayed and stored photos diverge with no file to upload.
    /// There is no sound action, so submit warns and sends nothing.
    Inconsistent,
}
