//! In-memory document store.
//!
//! This is the default when no remote backend is configured.
//! Subscriptions ride a broadcast channel that carries the name of
//! each mutated collection; every relevant change re-runs the query.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use finch_core::ports::{
    Direction, Document, DocumentStore, Fields, Query, SnapshotHandler, StoreError, Subscription,
};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// In-memory document store backed by per-collection ordered maps.
pub struct MemoryDocs {
    collections: Arc<RwLock<Collections>>,
    changes: broadcast::Sender<String>,
}

impl MemoryDocs {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            changes: broadcast::channel(buffer_size).0,
        }
    }

    fn notify(&self, collection: &str) {
        // Ignore send errors (no subscribers)
        let _ = self.changes.send(collection.to_string());
    }
}

impl Default for MemoryDocs {
    fn default() -> Self {
        Self::new(100)
    }
}

fn run_query(collections: &Collections, query: &Query) -> Vec<Document> {
    let Some(docs) = collections.get(&query.collection) else {
        return Vec::new();
    };

    let mut matches: Vec<Document> = docs
        .iter()
        .filter(|(_, fields)| {
            query
                .filters
                .iter()
                .all(|(field, value)| fields.get(field) == Some(value))
        })
        .map(|(id, fields)| Document {
            id: id.clone(),
            fields: fields.clone(),
        })
        .collect();

    if let Some((field, direction)) = &query.order_by {
        matches.sort_by(|a, b| {
            let ord = cmp_values(a.fields.get(field), b.fields.get(field));
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }
    if let Some(limit) = query.limit {
        matches.truncate(limit);
    }
    matches
}

/// Order JSON values for sorting: missing and null first, then bools,
/// numbers, strings. Only same-kind values compare by content.
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocs {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        drop(collections);

        self.notify(collection);
        tracing::debug!(collection = %collection, id = %id, "Document created");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let fields = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        // Merge keeps untouched fields; a null in the patch assigns null.
        for (key, value) in patch {
            fields.insert(key, value);
        }
        drop(collections);

        self.notify(collection);
        tracing::debug!(collection = %collection, id = %id, "Document updated");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        drop(collections);

        if removed.is_none() {
            return Err(StoreError::NotFound);
        }
        self.notify(collection);
        tracing::debug!(collection = %collection, id = %id, "Document deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        query: Query,
        handler: SnapshotHandler,
    ) -> Result<Subscription, StoreError> {
        let mut changes = self.changes.subscribe();
        let collections = Arc::clone(&self.collections);

        let task = tokio::spawn(async move {
            tracing::debug!(collection = %query.collection, "Subscription started");

            // Initial snapshot, then one per relevant change.
            let snapshot = run_query(&*collections.read().await, &query);
            handler(snapshot).await;

            loop {
                match changes.recv().await {
                    Ok(changed) if changed == query.collection => {
                        let snapshot = run_query(&*collections.read().await, &query);
                        handler(snapshot).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        tracing::warn!(
                            collection = %query.collection,
                            lagged = count,
                            "Subscriber lagged behind; refreshing"
                        );
                        let snapshot = run_query(&*collections.read().await, &query);
                        handler(snapshot).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!(collection = %query.collection, "Change feed closed");
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(task))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Subscribe with a handler that forwards snapshots into a channel.
    async fn watch(
        docs: &MemoryDocs,
        query: Query,
    ) -> (Subscription, mpsc::UnboundedReceiver<Vec<Document>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: SnapshotHandler = Box::new(move |snapshot| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(snapshot);
            })
        });
        let subscription = docs.subscribe(query, handler).await.unwrap();
        (subscription, rx)
    }

    #[tokio::test]
    async fn update_merges_and_null_assigns() {
        let docs = MemoryDocs::default();
        let id = docs
            .create("posts", fields(&[("text", json!("hi")), ("photo_url", json!("u"))]))
            .await
            .unwrap();

        docs.update("posts", &id, fields(&[("photo_url", Value::Null)]))
            .await
            .unwrap();

        let query = Query::collection("posts");
        let snapshot = run_query(&*docs.collections.read().await, &query);
        assert_eq!(snapshot[0].fields["text"], json!("hi"));
        assert_eq!(snapshot[0].fields["photo_url"], Value::Null);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let docs = MemoryDocs::default();
        assert!(matches!(
            docs.update("posts", "nope", Fields::new()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            docs.delete("posts", "nope").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn queries_filter_order_and_limit() {
        let docs = MemoryDocs::default();
        for (author, ts) in [("alice", 3), ("bob", 1), ("alice", 2)] {
            docs.create(
                "posts",
                fields(&[("author_id", json!(author)), ("created_at", json!(ts))]),
            )
            .await
            .unwrap();
        }

        let query = Query::collection("posts")
            .where_eq("author_id", json!("alice"))
            .order_by("created_at", Direction::Descending)
            .limit(1);
        let snapshot = run_query(&*docs.collections.read().await, &query);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].fields["created_at"], json!(3));
    }

    #[tokio::test]
    async fn subscribers_get_the_initial_snapshot_then_changes() {
        let docs = MemoryDocs::default();
        docs.create("posts", fields(&[("created_at", json!(1))]))
            .await
            .unwrap();

        let (_subscription, mut rx) = watch(&docs, Query::collection("posts")).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.len(), 1);

        docs.create("posts", fields(&[("created_at", json!(2))]))
            .await
            .unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn unrelated_collections_do_not_wake_subscribers() {
        let docs = MemoryDocs::default();
        let (_subscription, mut rx) = watch(&docs, Query::collection("posts")).await;
        rx.recv().await.unwrap();

        docs.create("likes", fields(&[("created_at", json!(1))]))
            .await
            .unwrap();
        docs.create("posts", fields(&[("created_at", json!(2))]))
            .await
            .unwrap();

        // Only the posts change produces a snapshot.
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_the_subscription_stops_delivery() {
        let docs = MemoryDocs::default();
        let (subscription, mut rx) = watch(&docs, Query::collection("posts")).await;
        rx.recv().await.unwrap();

        drop(subscription);
        docs.create("posts", fields(&[("created_at", json!(1))]))
            .await
            .unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn value_ordering_is_total_enough_for_timestamps() {
        assert_eq!(
            cmp_values(Some(&json!(1)), Some(&json!(2))),
            Ordering::Less
        );
        assert_eq!(
            cmp_values(Some(&json!("a")), Some(&json!("b"))),
            Ordering::Less
        );
        assert_eq!(cmp_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(
            cmp_values(Some(&Value::Null), Some(&json!(1))),
            Ordering::Less
        );
    }
}
