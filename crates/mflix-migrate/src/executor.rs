//! Submit a planned batch as one unordered bulk write.

use mflix_store::{BatchResult, BulkWriteOptions, DocumentStore};
use tracing::{info, warn};

use crate::{Batch, MigrateError};

/// Result of executing a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// The batch was empty; the store was not contacted.
    NothingToUpdate,
    /// The store applied the batch.
    Applied(BatchResult),
}

/// Apply `batch` to `collection` as a single unordered bulk write.
///
/// An empty batch never reaches the store. Item failures come back inside
/// the [`BatchResult`]; a failed call is returned as an error and not retried.
pub async fn execute(
    store: &dyn DocumentStore,
    collection: &str,
    batch: Batch,
) -> Result<Execution, MigrateError> {
    if batch.is_empty() {
        info!(collection, "batch is empty, skipping bulk write");
        return Ok(Execution::NothingToUpdate);
    }

    let operations = batch.len();
    let result = store
        .bulk_write(
            collection,
            batch.into_instructions(),
            BulkWriteOptions::unordered(),
        )
        .await?;

    for failure in &result.failures {
        warn!(
            collection,
            index = failure.index,
            id = ?failure.id,
            message = %failure.message,
            "bulk write item failed"
        );
    }

    info!(
        collection,
        operations,
        matched = result.matched,
        modified = result.modified,
        failed = result.failures.len(),
        "bulk write applied"
    );

    Ok(Execution::Applied(result))
}
