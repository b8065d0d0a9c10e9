//! Document store access for the mflix cleanup migration.
//!
//! This crate provides the narrow store surface the migration needs,
//! query-by-filter and unordered bulk update, plus three implementations.
//!
//! ## Features
//!
//! - **Documents**: Extended-JSON documents with dotted field paths and `$type` classification
//! - **Filters**: `$type` / `$not $type` predicates over a single field
//! - **MemoryStore**: In-process collections with MongoDB bulk-write semantics
//! - **MongoStore**: MongoDB driver adapter; the store the `mflix` binary uses by default
//! - **HttpStore**: Client for the JSON-over-HTTP adapter contract described in its module

mod client;
pub mod document;
mod error;
mod filter;
mod memory;
mod mongo;
mod store;
mod types;

pub use client::{HttpStore, HttpStoreConfig};
pub use document::{Document, ID_FIELD, ValueType, get_path, record_id, set_path};
pub use error::{PathConflict, StoreError};
pub use filter::Filter;
pub use memory::MemoryStore;
pub use mongo::{MongoStore, MongoStoreConfig};
pub use store::{DocumentStore, DocumentStream};
pub use types::{BatchResult, BulkWriteOptions, CanonicalValue, UpdateInstruction, WriteFailure};
