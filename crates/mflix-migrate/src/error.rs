//! Error types for the migration.

use std::num::ParseIntError;

use mflix_store::{StoreError, ValueType};
use thiserror::Error;

/// Errors that end a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid migration configuration.
    #[error("invalid migration configuration: {0}")]
    InvalidConfig(String),
}

/// Why a single record could not be transformed.
///
/// These never end a run; the record is logged and left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Record has no `_id` to address an update to.
    #[error("record has no _id")]
    MissingId,

    /// Rating text is not an integer.
    #[error("could not parse {raw:?} into number at {path} on record {id}: {source}")]
    Rating {
        id: String,
        path: String,
        raw: String,
        source: ParseIntError,
    },

    /// Timestamp text does not match the expected format.
    #[error("string date {raw:?} cannot be parsed using {format:?} format at {path} on record {id}: {source}")]
    Timestamp {
        id: String,
        path: String,
        raw: String,
        format: String,
        source: chrono::ParseError,
    },

    /// Field holds a value that is neither canonical nor text.
    #[error("unexpected {found} value at {path} on record {id}")]
    UnexpectedType {
        id: String,
        path: String,
        found: ValueType,
    },
}

impl TransformError {
    /// The offending raw value, when there is one.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Rating { raw, .. } | Self::Timestamp { raw, .. } => Some(raw),
            Self::MissingId | Self::UnexpectedType { .. } => None,
        }
    }
}
