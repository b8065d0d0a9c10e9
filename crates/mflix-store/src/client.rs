//! HTTP client for stores fronted by a JSON gateway.
//!
//! This is an adapter contract, not a vendor API: a gateway placed in front
//! of a deployment that cannot be reached with a driver implements these two
//! actions, both `POST` with JSON bodies.
//!
//! - `{base}/action/find` takes `{database, collection, filter, limit, cursor?}`
//!   and answers `{documents, cursor?}`. The scan ends when the cursor is
//!   absent, a page is empty, or a cursor comes back a second time.
//! - `{base}/action/bulkWrite` takes `{database, collection, ordered,
//!   operations: [{updateOne: {filter: {_id}, update: {$set: {..}}}}]}` and
//!   answers `{matchedCount, modifiedCount, writeErrors: [{index, errmsg}]}`.
//!
//! Non-2xx answers carry `{error?, message}` and become [`StoreError::Server`].
//! Documents use Extended JSON on both sides.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    BatchResult, BulkWriteOptions, Document, DocumentStore, DocumentStream, Filter, StoreError,
    UpdateInstruction, WriteFailure,
};

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the data API, without a trailing `/action`.
    pub base_url: String,
    /// Database holding the collections.
    pub database: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Documents requested per `find` page.
    pub page_size: u32,
}

impl HttpStoreConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            page_size: 500,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    database: &'a str,
    collection: &'a str,
    filter: Value,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

/// One page of `find` results.
#[derive(Debug, Deserialize)]
struct FindPage {
    documents: Vec<Document>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkWriteRequest<'a> {
    database: &'a str,
    collection: &'a str,
    ordered: bool,
    operations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkWriteResponse {
    #[serde(default)]
    matched_count: u64,
    modified_count: u64,
    #[serde(default)]
    write_errors: Vec<WireWriteError>,
}

#[derive(Debug, Deserialize)]
struct WireWriteError {
    index: usize,
    #[serde(alias = "errmsg")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    message: String,
}

/// Paging state for `find`: next cursor and the cursors already seen.
type PageState = Option<(Option<String>, HashSet<String>)>;

/// Document store reached over HTTP.
pub struct HttpStore {
    http: Client,
    config: HttpStoreConfig,
}

impl HttpStore {
    /// Create a client. No request is made until the first call.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let url = format!(
            "{}/action/{}",
            self.config.base_url.trim_end_matches('/'),
            action
        );

        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                StoreError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(ErrorBody {
                    error: Some(error),
                    message,
                }) => format!("{} - {}", error, message),
                Ok(ErrorBody { message, .. }) => message,
                Err(_) => text,
            };

            return Err(StoreError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: &Filter,
        cursor: Option<&str>,
    ) -> Result<FindPage, StoreError> {
        let request = FindRequest {
            database: &self.config.database,
            collection,
            filter: filter.to_json(),
            limit: self.config.page_size,
            cursor,
        };

        let page: FindPage = self.post("find", &request).await?;
        debug!(
            collection,
            count = page.documents.len(),
            more = page.cursor.is_some(),
            "fetched find page"
        );
        Ok(page)
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> DocumentStream<'a> {
        // State is the cursor of the next page plus every cursor handed out so
        // far; `None` once exhausted.
        let start: PageState = Some((None, HashSet::new()));
        stream::try_unfold(start, move |state: PageState| async move {
            let Some((cursor, mut seen)) = state else {
                return Ok(None);
            };
            let page = self.find_page(collection, filter, cursor.as_deref()).await?;

            // An empty page or a cursor already followed ends the scan.
            let next = match page.cursor {
                Some(next) if !page.documents.is_empty() && seen.insert(next.clone()) => {
                    Some((Some(next), seen))
                }
                Some(next) => {
                    debug!(collection, cursor = %next, "cursor makes no progress, ending scan");
                    None
                }
                None => None,
            };
            Ok::<_, StoreError>(Some((page.documents, next)))
        })
        .map_ok(|documents| stream::iter(documents.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    async fn bulk_write(
        &self,
        collection: &str,
        instructions: Vec<UpdateInstruction>,
        options: BulkWriteOptions,
    ) -> Result<BatchResult, StoreError> {
        if instructions.is_empty() {
            return Err(StoreError::InvalidRequest(
                "bulk write requires at least one operation".to_string(),
            ));
        }

        let request = BulkWriteRequest {
            database: &self.config.database,
            collection,
            ordered: options.ordered,
            operations: instructions
                .iter()
                .map(UpdateInstruction::to_write_model)
                .collect(),
        };

        debug!(
            collection,
            count = request.operations.len(),
            ordered = options.ordered,
            "submitting bulk write"
        );

        let response: BulkWriteResponse = self.post("bulkWrite", &request).await?;

        let failures = response
            .write_errors
            .into_iter()
            .map(|err| WriteFailure {
                id: instructions.get(err.index).map(|i| i.id.clone()),
                index: err.index,
                message: err.message,
            })
            .collect();

        Ok(BatchResult {
            matched: response.matched_count,
            modified: response.modified_count,
            failures,
        })
    }
}
