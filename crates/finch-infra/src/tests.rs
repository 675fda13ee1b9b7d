//! Workflow tests: the core services wired to the in-memory backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use finch_core::domain::{LocalFile, Post, Session, UserId, post};
use finch_core::ports::{
    AuthError, AutoConfirm, BlobError, BlobRef, BlobStore, DocumentStore, Fields, IdentityProvider,
    ProfileUpdate, Query, SnapshotHandler, StoreError, Subscription,
};
use finch_core::service::{
    LiveFeed, PAGE_SIZE, PostComposer, PostEditor, PostRemover, ProfileEditor, SessionGate,
    SubmitOutcome, SubmitState,
};
use finch_core::{Backend, Error, ValidationError};

use crate::{MemoryBlobs, MemoryDocs, MemoryIdentity};

/// Blob store that can fail uploads on demand and counts every call.
struct FlakyBlobs {
    inner: MemoryBlobs,
    fail_uploads: AtomicBool,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
}

impl FlakyBlobs {
    fn new() -> Self {
        Self {
            inner: MemoryBlobs::new(),
            fail_uploads: AtomicBool::new(false),
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, BlobError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BlobError::Upload("simulated outage".to_string()));
        }
        self.inner.upload(path, bytes, content_type).await
    }

    fn public_url(&self, blob: &BlobRef) -> String {
        self.inner.public_url(blob)
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(path).await
    }
}

/// Document store that delays `create`, keeping one submit in flight
/// long enough for a second one to collide with it.
struct SlowDocs {
    inner: MemoryDocs,
    delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowDocs {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create(collection, fields).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn subscribe(
        &self,
        query: Query,
        handler: SnapshotHandler,
    ) -> Result<Subscription, StoreError> {
        self.inner.subscribe(query, handler).await
    }
}

/// Identity wrapper that counts profile updates reaching the provider.
struct CountingIdentity {
    inner: MemoryIdentity,
    profile_updates: AtomicUsize,
}

impl CountingIdentity {
    fn new() -> Self {
        Self {
            inner: MemoryIdentity::default(),
            profile_updates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for CountingIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        self.inner.sign_up(email, password, display_name).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.sign_out().await
    }

    async fn current_session(&self) -> Option<Session> {
        self.inner.current_session().await
    }

    async fn wait_until_ready(&self) {
        self.inner.wait_until_ready().await;
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, AuthError> {
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_profile(update).await
    }
}

struct Harness {
    backend: Backend,
    docs: Arc<MemoryDocs>,
    blobs: Arc<FlakyBlobs>,
}

fn harness() -> Harness {
    let docs = Arc::new(MemoryDocs::default());
    let blobs = Arc::new(FlakyBlobs::new());
    let backend = Backend::new(
        Arc::new(MemoryIdentity::default()),
        docs.clone(),
        blobs.clone(),
    );
    Harness {
        backend,
        docs,
        blobs,
    }
}

async fn sign_up(backend: &Backend, name: &str, email: &str) -> Session {
    SessionGate::new(backend)
        .sign_up(name, email, "secret123")
        .await
        .unwrap()
}

/// Open a fresh feed subscription and wait for its first snapshot.
async fn latest_posts(backend: &Backend, author: Option<&UserId>) -> Vec<Post> {
    let mut feed = LiveFeed::new(backend.clone())
        .subscribe(author)
        .await
        .unwrap();
    assert!(feed.changed().await);
    feed.posts()
}

fn photo(name: &str, bytes: Vec<u8>) -> LocalFile {
    LocalFile::new(name, "image/jpeg", bytes)
}

#[tokio::test]
async fn compose_uploads_and_links_the_photo() {
    let h = harness();
    let author = sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());

    let id = composer
        .compose("first light", Some(photo("sunset.jpg", vec![1, 2, 3])))
        .await
        .unwrap();

    let posts = latest_posts(&h.backend, None).await;
    assert_eq!(posts.len(), 1);
    let stored = &posts[0];
    assert_eq!(stored.id, id);
    assert_eq!(stored.author_id, author.user_id);
    assert_eq!(stored.author_name, "Ada");
    assert_eq!(stored.text, "first light");
    assert!(stored.created_at > 0);
    assert_eq!(stored.updated_at, None);

    let url = stored.photo_url.as_deref().unwrap();
    assert!(url.starts_with("memory://posts/"));
    assert!(h.blobs.inner.contains(&stored.photo_path()).await);
}

#[tokio::test]
async fn failed_photo_upload_keeps_the_post() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    h.blobs.fail_uploads.store(true, Ordering::SeqCst);
    let composer = PostComposer::new(h.backend.clone());

    let err = composer
        .compose("almost", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap_err();
    let Error::PhotoUpload { post_id, .. } = err else {
        panic!("expected a photo upload failure, got {err:?}");
    };

    // The document survives the failed attachment, photoless.
    let posts = latest_posts(&h.backend, None).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, post_id);
    assert_eq!(posts[0].text, "almost");
    assert_eq!(posts[0].photo_url, None);
}

#[tokio::test]
async fn compose_rejects_signed_out_and_invalid_text() {
    let h = harness();
    let composer = PostComposer::new(h.backend.clone());
    assert!(matches!(
        composer.compose("hello", None).await,
        Err(Error::SignedOut)
    ));

    sign_up(&h.backend, "Ada", "ada@example.com").await;
    assert!(matches!(
        composer.compose("", None).await,
        Err(Error::Validation(ValidationError::EmptyText))
    ));
    assert!(matches!(
        composer.compose(&"x".repeat(201), None).await,
        Err(Error::Validation(ValidationError::TextTooLong { .. }))
    ));

    assert!(latest_posts(&h.backend, None).await.is_empty());
}

#[tokio::test]
async fn text_only_compose_spans_the_length_range() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());

    composer.compose("x", None).await.unwrap();
    composer.compose(&"y".repeat(200), None).await.unwrap();

    let posts = latest_posts(&h.backend, None).await;
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|post| post.photo_url.is_none()));
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_submits_leave_one_winner() {
    let docs = Arc::new(SlowDocs {
        inner: MemoryDocs::default(),
        delay: Duration::from_millis(50),
    });
    let backend = Backend::new(
        Arc::new(MemoryIdentity::default()),
        docs,
        Arc::new(FlakyBlobs::new()),
    );
    sign_up(&backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(backend.clone());

    // The first submit parks inside the slow create; the second finds
    // the flight taken.
    let (first, second) = tokio::join!(
        composer.compose("first", None),
        composer.compose("second", None)
    );
    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::Busy)));

    // The permit is back, so the next submit goes through.
    assert_eq!(composer.state(), SubmitState::Idle);
    composer.compose("third", None).await.unwrap();
    assert_eq!(latest_posts(&backend, None).await.len(), 2);
}

#[tokio::test]
async fn edit_replace_swaps_the_photo_in_place() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("caption", Some(photo("old.jpg", vec![1, 1])))
        .await
        .unwrap();

    let before = latest_posts(&h.backend, None).await.remove(0);
    let old_url = before.photo_url.clone().unwrap();

    let mut editor = PostEditor::open(h.backend.clone(), before.clone());
    editor.set_text("new caption");
    editor.select_photo(photo("new.jpg", vec![2, 2]));
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);

    // The old object is deleted, the new one uploaded at the same path.
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 2);
    assert_eq!(h.blobs.deletes.load(Ordering::SeqCst), 1);
    let (_, bytes) = h.blobs.inner.read(&before.photo_path()).await.unwrap();
    assert_eq!(bytes, vec![2, 2]);

    let after = latest_posts(&h.backend, None).await.remove(0);
    assert_eq!(after.id, before.id);
    assert_eq!(after.text, "new caption");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at.is_some());
    let new_url = after.photo_url.unwrap();
    assert_ne!(new_url, old_url);
}

#[tokio::test]
async fn edit_remove_clears_photo_and_blob() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("caption", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();

    let before = latest_posts(&h.backend, None).await.remove(0);
    let mut editor = PostEditor::open(h.backend.clone(), before.clone());
    editor.remove_photo();
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);

    let after = latest_posts(&h.backend, None).await.remove(0);
    assert_eq!(after.photo_url, None);
    assert!(after.updated_at.is_some());
    assert!(!h.blobs.inner.contains(&before.photo_path()).await);
}

#[tokio::test]
async fn text_only_edit_keeps_the_photo() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("caption", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();

    let before = latest_posts(&h.backend, None).await.remove(0);
    let mut editor = PostEditor::open(h.backend.clone(), before.clone());
    editor.set_text("better caption");
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);

    // No blob traffic at all for a text-only edit.
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(h.blobs.deletes.load(Ordering::SeqCst), 0);

    let after = latest_posts(&h.backend, None).await.remove(0);
    assert_eq!(after.text, "better caption");
    assert_eq!(after.photo_url, before.photo_url);
}

#[tokio::test]
async fn edit_allows_empty_text_only_with_a_photo() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    let with_photo_id = composer
        .compose("caption", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();
    let text_only_id = composer.compose("words", None).await.unwrap();

    let posts = latest_posts(&h.backend, None).await;
    let with_photo = posts.iter().find(|p| p.id == with_photo_id).unwrap();
    let text_only = posts.iter().find(|p| p.id == text_only_id).unwrap();

    // A photo post may drop its text entirely.
    let mut editor = PostEditor::open(h.backend.clone(), with_photo.clone());
    editor.set_text("");
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);
    let posts = latest_posts(&h.backend, None).await;
    let edited = posts.iter().find(|p| p.id == with_photo_id).unwrap();
    assert_eq!(edited.text, "");
    assert!(edited.photo_url.is_some());

    // A text-only post may not.
    let mut editor = PostEditor::open(h.backend.clone(), text_only.clone());
    editor.set_text("");
    assert!(matches!(
        editor.submit().await,
        Err(Error::Validation(ValidationError::EmptyPost))
    ));
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer.compose("mine", None).await.unwrap();
    let post = latest_posts(&h.backend, None).await.remove(0);

    let gate = SessionGate::new(&h.backend);
    gate.sign_out().await.unwrap();
    sign_up(&h.backend, "Bea", "bea@example.com").await;

    let mut editor = PostEditor::open(h.backend.clone(), post.clone());
    editor.set_text("hijacked");
    assert!(matches!(editor.submit().await, Err(Error::NotAuthor)));

    let remover = PostRemover::new(h.backend.clone());
    assert!(matches!(
        remover.delete(&AutoConfirm(true), &post).await,
        Err(Error::NotAuthor)
    ));

    let posts = latest_posts(&h.backend, None).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "mine");
}

#[tokio::test]
async fn remove_then_restore_needs_no_new_upload() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("caption", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();

    let before = latest_posts(&h.backend, None).await.remove(0);
    let mut editor = PostEditor::open(h.backend.clone(), before.clone());
    editor.remove_photo();
    editor.restore_photo();
    editor.set_text("kept after all");
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);

    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(h.blobs.deletes.load(Ordering::SeqCst), 0);
    let after = latest_posts(&h.backend, None).await.remove(0);
    assert_eq!(after.photo_url, before.photo_url);
    assert_eq!(after.text, "kept after all");
}

#[tokio::test]
async fn select_then_restore_submits_text_only() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("caption", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();

    let before = latest_posts(&h.backend, None).await.remove(0);
    let mut editor = PostEditor::open(h.backend.clone(), before.clone());
    editor.select_photo(photo("tmp.jpg", vec![9]));
    editor.restore_photo();
    editor.set_text("second thoughts");
    assert_eq!(editor.submit().await.unwrap(), SubmitOutcome::Updated);

    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(h.blobs.deletes.load(Ordering::SeqCst), 0);
    let after = latest_posts(&h.backend, None).await.remove(0);
    assert_eq!(after.photo_url, before.photo_url);
}

#[tokio::test]
async fn feed_orders_newest_first_and_caps_the_page() {
    let h = harness();
    let author = sign_up(&h.backend, "Ada", "ada@example.com").await;

    let total = PAGE_SIZE as i64 + 3;
    for i in 1..=total {
        let fields = Post::creation_fields(&author, &format!("post {i}"), i);
        h.docs.create(post::COLLECTION, fields).await.unwrap();
    }

    let posts = latest_posts(&h.backend, None).await;
    assert_eq!(posts.len(), PAGE_SIZE);
    assert_eq!(posts[0].created_at, total);
    assert_eq!(posts[PAGE_SIZE - 1].created_at, 4);
    assert!(posts.windows(2).all(|w| w[0].created_at > w[1].created_at));
}

#[tokio::test]
async fn feed_filters_by_author() {
    let h = harness();
    let ada = sign_up(&h.backend, "Ada", "ada@example.com").await;
    let bea = Session {
        user_id: UserId::from("bea"),
        email: "bea@example.com".to_string(),
        display_name: Some("Bea".to_string()),
        avatar_url: None,
    };

    for (author, stamp) in [(&ada, 1), (&bea, 2), (&ada, 3)] {
        let fields = Post::creation_fields(author, "hello", stamp);
        h.docs.create(post::COLLECTION, fields).await.unwrap();
    }

    let everyone = latest_posts(&h.backend, None).await;
    assert_eq!(everyone.len(), 3);
    assert_eq!(everyone[0].author_id, ada.user_id);

    let only_ada = latest_posts(&h.backend, Some(&ada.user_id)).await;
    assert_eq!(only_ada.len(), 2);
    assert!(only_ada.iter().all(|p| p.author_id == ada.user_id));
}

#[tokio::test]
async fn feed_delivers_live_changes() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());

    let mut feed = LiveFeed::new(h.backend.clone())
        .subscribe(None)
        .await
        .unwrap();
    assert!(feed.changed().await);
    assert!(feed.posts().is_empty());

    composer.compose("breaking", None).await.unwrap();
    assert!(feed.changed().await);
    let posts = feed.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "breaking");
}

#[tokio::test]
async fn confirmed_delete_cleans_up_document_and_photo() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("going away", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();
    let post = latest_posts(&h.backend, None).await.remove(0);

    let remover = PostRemover::new(h.backend.clone());
    assert!(remover.delete(&AutoConfirm(true), &post).await.unwrap());

    assert!(latest_posts(&h.backend, None).await.is_empty());
    assert!(!h.blobs.inner.contains(&post.photo_path()).await);
}

#[tokio::test]
async fn declined_delete_sends_nothing() {
    let h = harness();
    sign_up(&h.backend, "Ada", "ada@example.com").await;
    let composer = PostComposer::new(h.backend.clone());
    composer
        .compose("staying", Some(photo("p.jpg", vec![1])))
        .await
        .unwrap();
    let post = latest_posts(&h.backend, None).await.remove(0);

    let remover = PostRemover::new(h.backend.clone());
    assert!(!remover.delete(&AutoConfirm(false), &post).await.unwrap());

    assert_eq!(latest_posts(&h.backend, None).await.len(), 1);
    assert_eq!(h.blobs.deletes.load(Ordering::SeqCst), 0);
    assert!(h.blobs.inner.contains(&post.photo_path()).await);
}

#[tokio::test]
async fn rename_skips_the_provider_when_unchanged() {
    let identity = Arc::new(CountingIdentity::new());
    let backend = Backend::new(
        identity.clone(),
        Arc::new(MemoryDocs::default()),
        Arc::new(FlakyBlobs::new()),
    );
    sign_up(&backend, "Ada", "ada@example.com").await;
    let profile = ProfileEditor::new(backend.clone());

    // Same name verbatim: accepted locally, never sent.
    let session = profile.rename("Ada").await.unwrap();
    assert_eq!(session.display_name.as_deref(), Some("Ada"));
    assert_eq!(identity.profile_updates.load(Ordering::SeqCst), 0);

    let session = profile.rename("Ada Lovelace").await.unwrap();
    assert_eq!(session.display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(identity.profile_updates.load(Ordering::SeqCst), 1);

    let gate = SessionGate::new(&backend);
    let current = gate.current().await.unwrap();
    assert_eq!(current.display_name.as_deref(), Some("Ada Lovelace"));

    assert!(matches!(
        profile.rename("").await,
        Err(Error::Validation(ValidationError::EmptyDisplayName))
    ));
    assert_eq!(identity.profile_updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn avatar_reupload_changes_the_url_but_not_the_path() {
    let h = harness();
    let session = sign_up(&h.backend, "Ada", "ada@example.com").await;
    let profile = ProfileEditor::new(h.backend.clone());

    let first = profile.set_avatar(photo("a.png", vec![1])).await.unwrap();
    let first_url = first.avatar_url.unwrap();
    assert!(first_url.starts_with("memory://avatars/"));

    let second = profile.set_avatar(photo("b.png", vec![2])).await.unwrap();
    let second_url = second.avatar_url.unwrap();
    assert_ne!(second_url, first_url);

    // One slot per user; the second upload replaced the first object.
    let (_, bytes) = h.blobs.inner.read(&session.avatar_path()).await.unwrap();
    assert_eq!(bytes, vec![2]);
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 2);
}
