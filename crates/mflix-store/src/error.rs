//! Error types for store access.

use thiserror::Error;

/// Errors that can occur when talking to a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// MongoDB driver error.
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store answered with a non-success status.
    #[error("store rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    /// Invalid response from the store.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request that the store refuses to run.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Document rejected on insert.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A document with the same `_id` already exists.
    #[error("duplicate key: _id {0}")]
    DuplicateKey(String),
}

/// A `$set` path that walks through a value which is not a sub-document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot set '{path}': '{parent}' is not a document")]
pub struct PathConflict {
    pub path: String,
    pub parent: String,
}
