//! Remote document store.
//!
//! Documents live behind a REST API at `/rest/v1/{collection}` with
//! equality filters (`field=eq.value`), `order` and `limit` params.
//! There is no push channel; `subscribe` polls the query and delivers
//! a snapshot whenever the result set differs from the last one.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use finch_core::ports::{
    Direction, Document, DocumentStore, Fields, Query, SnapshotHandler, StoreError, Subscription,
};

use crate::remote::{RemoteConfig, TokenCell};

/// Document store backed by the remote REST API.
#[derive(Clone)]
pub struct RemoteDocs {
    config: RemoteConfig,
    http: reqwest::Client,
    token: TokenCell,
}

impl RemoteDocs {
    pub fn new(config: RemoteConfig, http: reqwest::Client, token: TokenCell) -> Self {
        Self {
            config,
            http,
            token,
        }
    }

    fn endpoint(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, collection)
    }

    async fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.config.api_key);
        match self.token.read().await.as_ref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let request = self
            .http
            .get(self.endpoint(&query.collection))
            .query(&query_params(query));
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(net_err)?;
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(read_error(status, &body));
        }

        let rows: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(rows.into_iter().filter_map(split_row).collect())
    }
}

#[async_trait]
impl DocumentStore for RemoteDocs {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let request = self
            .http
            .post(self.endpoint(collection))
            .header("Prefer", "return=representation")
            .json(&fields);
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(net_err)?;
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(read_error(status, &body));
        }

        // The representation comes back as a one-row array.
        let mut rows: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| StoreError::Request(e.to_string()))?;
        let row = if rows.is_empty() {
            return Err(StoreError::Request("empty create response".to_string()));
        } else {
            rows.remove(0)
        };
        let document = split_row(row)
            .ok_or_else(|| StoreError::Request("create response without id".to_string()))?;

        tracing::debug!(collection, id = %document.id, "Document created");
        Ok(document.id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let request = self
            .http
            .patch(self.endpoint(collection))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(net_err)?;
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(read_error(status, &body));
        }

        // A filter that matched nothing patches nothing.
        let rows: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| StoreError::Request(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let request = self
            .http
            .delete(self.endpoint(collection))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(net_err)?;
        let status = response.status();
        let body = response.text().await.map_err(net_err)?;
        if !status.is_success() {
            return Err(read_error(status, &body));
        }

        let rows: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| StoreError::Request(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        query: Query,
        handler: SnapshotHandler,
    ) -> Result<Subscription, StoreError> {
        // Run the query once up front so a broken query fails the call
        // instead of spinning silently in the background.
        let initial = self.run_query(&query).await?;

        let store = self.clone();
        let interval = self.config.poll_interval;
        let task = tokio::spawn(async move {
            let mut last = initial;
            handler(last.clone()).await;

            loop {
                tokio::time::sleep(interval).await;
                match store.run_query(&query).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot;
                            handler(last.clone()).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(collection = %query.collection, error = %e, "Poll failed");
                    }
                }
            }
        });

        Ok(Subscription::new(task))
    }
}

/// Render a query as REST parameters.
fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (field, value) in &query.filters {
        params.push((field.clone(), format!("eq.{}", plain(value))));
    }
    if let Some((field, direction)) = &query.order_by {
        let dir = match direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{field}.{dir}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Filter values go on the wire bare, not JSON-encoded. Strings lose
/// their quotes; everything else serializes as-is.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull the `id` column out of a row; the rest are the fields.
fn split_row(row: Value) -> Option<Document> {
    let Value::Object(mut fields) = row else {
        return None;
    };
    let id = match fields.remove("id") {
        Some(Value::String(id)) => id,
        Some(other) => plain(&other),
        None => return None,
    };
    Some(Document { id, fields })
}

fn read_error(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        StoreError::NotFound
    } else {
        StoreError::Request(format!("{status}: {body}"))
    }
}

fn net_err(e: reqwest::Error) -> StoreError {
    StoreError::Connection(e.to_string())
}
