//! In-process document store.
//!
//! Collections live behind a single lock. `find` snapshots the matching
//! documents when the stream is first polled; `bulk_write` holds the write
//! lock for the whole batch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    BatchResult, BulkWriteOptions, Document, DocumentStore, DocumentStream, Filter, StoreError,
    UpdateInstruction, WriteFailure, document::ID_FIELD, set_path,
};

/// Thread-safe in-memory collections with MongoDB bulk-write semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    bulk_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document. It must carry a unique `_id`.
    pub async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let id = doc
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| StoreError::InvalidDocument("document has no _id".to_string()))?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.get(ID_FIELD) == Some(&id)) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }
        docs.push(doc);
        Ok(())
    }

    /// Insert JSON objects, rejecting anything that is not an object.
    pub async fn insert_many(
        &self,
        collection: &str,
        docs: impl IntoIterator<Item = Value>,
    ) -> Result<(), StoreError> {
        for value in docs {
            match value {
                Value::Object(doc) => self.insert(collection, doc).await?,
                other => {
                    return Err(StoreError::InvalidDocument(format!(
                        "expected an object, got {}",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fetch a document by `_id`.
    pub async fn get(&self, collection: &str, id: &Value) -> Option<Document> {
        let collections = self.collections.read().await;
        collections
            .get(collection)?
            .iter()
            .find(|d| d.get(ID_FIELD) == Some(id))
            .cloned()
    }

    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, Vec::len)
    }

    /// Number of `bulk_write` calls received so far.
    pub fn bulk_write_calls(&self) -> usize {
        self.bulk_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> DocumentStream<'a> {
        stream::once(async move {
            let collections = self.collections.read().await;
            let matched: Vec<Result<Document, StoreError>> = collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| filter.matches(d))
                        .cloned()
                        .map(Ok)
                        .collect()
                })
                .unwrap_or_default();
            debug!(collection, matched = matched.len(), "memory find");
            stream::iter(matched)
        })
        .flatten()
        .boxed()
    }

    async fn bulk_write(
        &self,
        collection: &str,
        instructions: Vec<UpdateInstruction>,
        options: BulkWriteOptions,
    ) -> Result<BatchResult, StoreError> {
        self.bulk_writes.fetch_add(1, Ordering::SeqCst);

        if instructions.is_empty() {
            return Err(StoreError::InvalidRequest(
                "bulk write requires at least one operation".to_string(),
            ));
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let mut matched: Vec<&Value> = Vec::new();
        let mut modified: Vec<&Value> = Vec::new();
        let mut failures = Vec::new();

        for (index, instruction) in instructions.iter().enumerate() {
            let Some(doc) = docs
                .iter_mut()
                .find(|d| d.get(ID_FIELD) == Some(&instruction.id))
            else {
                continue;
            };

            if !matched.contains(&&instruction.id) {
                matched.push(&instruction.id);
            }

            match set_path(doc, &instruction.path, instruction.value.to_json()) {
                Ok(true) => {
                    if !modified.contains(&&instruction.id) {
                        modified.push(&instruction.id);
                    }
                }
                Ok(false) => {}
                Err(conflict) => {
                    failures.push(WriteFailure {
                        index,
                        id: Some(instruction.id.clone()),
                        message: conflict.to_string(),
                    });
                    if options.ordered {
                        break;
                    }
                }
            }
        }

        debug!(
            collection,
            operations = instructions.len(),
            matched = matched.len(),
            modified = modified.len(),
            failed = failures.len(),
            ordered = options.ordered,
            "memory bulk write"
        );

        Ok(BatchResult {
            matched: matched.len() as u64,
            modified: modified.len() as u64,
            failures,
        })
    }
}
