//! Extended-JSON documents.
//!
//! Documents are plain JSON objects. Typed BSON values use the canonical
//! Extended JSON wrappers, so `{"$date": "..."}` is a date and
//! `{"$oid": "..."}` is an object id. Everything else maps onto JSON directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PathConflict;

/// A single stored record.
pub type Document = Map<String, Value>;

/// Field holding the immutable record identifier.
pub const ID_FIELD: &str = "_id";

const DATE_KEY: &str = "$date";
const OID_KEY: &str = "$oid";

/// Value types that a `$type` predicate can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Number,
    String,
    Date,
    ObjectId,
    Bool,
    Object,
    Array,
    Null,
}

impl ValueType {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(map) if map.len() == 1 && map.contains_key(DATE_KEY) => Self::Date,
            Value::Object(map) if map.len() == 1 && map.contains_key(OID_KEY) => Self::ObjectId,
            Value::Object(_) => Self::Object,
        }
    }

    /// The `$type` alias used on the wire.
    pub fn alias(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::ObjectId => "objectId",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// Look up a dotted field path such as `imdb.rating`.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted field path, creating missing sub-documents on the way.
///
/// Returns `Ok(true)` when the stored value changed and `Ok(false)` when the
/// field already held `value`.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<bool, PathConflict> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut target = doc;
    if let Some(parents) = parents {
        let mut walked = String::new();
        for segment in parents.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);

            target = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| PathConflict {
                    path: path.to_string(),
                    parent: walked.clone(),
                })?;
        }
    }

    if target.get(leaf) == Some(&value) {
        return Ok(false);
    }
    target.insert(leaf.to_string(), value);
    Ok(true)
}

/// The record's `_id`, if present.
pub fn record_id(doc: &Document) -> Option<&Value> {
    doc.get(ID_FIELD)
}
