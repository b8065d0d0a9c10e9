//! The store surface the migration depends on.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{BatchResult, BulkWriteOptions, Document, Filter, StoreError, UpdateInstruction};

/// Lazily produced query results.
pub type DocumentStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

/// Query-by-filter and bulk update over named collections.
///
/// Timeouts and cancellation belong to the implementation; callers add none.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stream every document in `collection` that matches `filter`.
    fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> DocumentStream<'a>;

    /// Apply `instructions` as one bulk write.
    ///
    /// With `ordered = false` the store may apply items in any order and keeps
    /// going past failed items, which are reported in the result.
    async fn bulk_write(
        &self,
        collection: &str,
        instructions: Vec<UpdateInstruction>,
        options: BulkWriteOptions,
    ) -> Result<BatchResult, StoreError>;
}
