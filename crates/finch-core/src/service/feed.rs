//! Live feed - an ordered post list kept fresh by a store subscription.

use std::sync::Arc;

use tokio::sync::watch;

use crate::context::Backend;
use crate::domain::post::{self, field};
use crate::domain::{Post, UserId};
use crate::error::Error;
use crate::ports::{Direction, Document, Query, SnapshotHandler, Subscription};

/// Posts shown per feed page.
pub const PAGE_SIZE: usize = 25;

/// Opens live feed subscriptions.
pub struct LiveFeed {
    backend: Backend,
}

/// A running feed. Dropping the handle tears the subscription down;
/// no snapshot is delivered afterwards.
pub struct FeedHandle {
    rx: watch::Receiver<Vec<Post>>,
    _subscription: Subscription,
}

impl FeedHandle {
    /// Latest snapshot. Every store notification replaces the whole
    /// list; there is no client-side merging.
    pub fn posts(&self) -> Vec<Post> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `false` once the
    /// subscription is gone and no further snapshot will arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl LiveFeed {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Subscribe to the home feed, or to a single author's posts.
    /// The first snapshot arrives without waiting for a change.
    pub async fn subscribe(&self, author: Option<&UserId>) -> Result<FeedHandle, Error> {
        let mut query = Query::collection(post::COLLECTION)
            .order_by(field::CREATED_AT, Direction::Descending)
            .limit(PAGE_SIZE);
        if let Some(author) = author {
            query = query.where_eq(field::AUTHOR_ID, serde_json::json!(author));
        }

        let (tx, rx) = watch::channel(Vec::new());
        let tx = Arc::new(tx);
        let handler: SnapshotHandler = Box::new(move |docs| {
            let tx = Arc::clone(&tx);
            Box::pin(async move {
                let _ = tx.send(decode_snapshot(&docs));
            })
        });

        let subscription = self.backend.docs.subscribe(query, handler).await?;
        tracing::debug!(author = ?author, "Feed subscription opened");
        Ok(FeedHandle {
            rx,
            _subscription: subscription,
        })
    }
}

/// Decode every readable post; undecodable documents are logged and
/// skipped rather than poisoning the snapshot.
fn decode_snapshot(docs: &[Document]) -> Vec<Post> {
    docs.iter()
        .filter_map(|doc| match Post::from_fields(&doc.id, &doc.fields) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Skipping undecodable post document");
                None
            }
        })
        .collect()
}
