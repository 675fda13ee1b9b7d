//! Document store port - abstraction over the JSON document backend.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

/// Field map of one document, as stored.
pub type Fields = Map<String, Value>;

/// A stored document together with its externally assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Sort direction for a query's order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Declarative query: equality filters, one order key, a result cap.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Handler for query snapshots. Each call carries the full result set;
/// the previous one is superseded, not patched.
pub type SnapshotHandler =
    Box<dyn Fn(Vec<Document>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Handle for an active subscription. Dropping it tears the delivery
/// task down; no snapshot arrives afterwards.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Document store trait - create, patch, delete and watch documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `patch` into an existing document. A null value in the
    /// patch assigns null; fields absent from the patch are untouched.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;

    /// Delete a document.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Watch a query. The handler receives the current result set right
    /// away and again after every relevant change.
    async fn subscribe(
        &self,
        query: Query,
        handler: SnapshotHandler,
    ) -> Result<Subscription, StoreError>;
}

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Document not found")]
    NotFound,
}
