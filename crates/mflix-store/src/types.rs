//! Update instructions and bulk-write results.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ValueType;

/// A correctly typed replacement value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    Int(i32),
    Date(DateTime<Utc>),
}

impl CanonicalValue {
    /// Extended-JSON form as stored in a document.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(n) => json!(n),
            Self::Date(at) => json!({ "$date": at.to_rfc3339_opts(SecondsFormat::Millis, true) }),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Number,
            Self::Date(_) => ValueType::Date,
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Date(at) => write!(f, "{}", at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Set one field on one record, addressed by `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInstruction {
    /// The target record's `_id`, verbatim.
    pub id: Value,
    /// Dotted field path.
    pub path: String,
    pub value: CanonicalValue,
}

impl UpdateInstruction {
    pub fn set(id: Value, path: impl Into<String>, value: CanonicalValue) -> Self {
        Self {
            id,
            path: path.into(),
            value,
        }
    }

    /// `updateOne` write model for the bulk-write wire format.
    pub fn to_write_model(&self) -> Value {
        json!({
            "updateOne": {
                "filter": { "_id": self.id },
                "update": { "$set": { self.path.as_str(): self.value.to_json() } }
            }
        })
    }
}

impl fmt::Display for UpdateInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: set {} = {}", self.id, self.path, self.value)
    }
}

/// Options for a bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkWriteOptions {
    /// Stop at the first failing item when true.
    pub ordered: bool,
}

impl BulkWriteOptions {
    pub fn unordered() -> Self {
        Self { ordered: false }
    }
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

/// One item of a bulk write that the store could not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFailure {
    /// Position of the instruction in the submitted batch.
    pub index: usize,
    /// `_id` of the targeted record, when known.
    pub id: Option<Value>,
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "item {} ({}): {}", self.index, id, self.message),
            None => write!(f, "item {}: {}", self.index, self.message),
        }
    }
}

/// Aggregate outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Documents matched by at least one instruction.
    pub matched: u64,
    /// Documents whose stored value actually changed.
    pub modified: u64,
    /// Items the store could not apply.
    pub failures: Vec<WriteFailure>,
}

impl BatchResult {
    /// True when no item failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_serializes_as_extended_json() {
        let at = Utc.with_ymd_and_hms(2015, 8, 1, 0, 0, 0).unwrap();
        let value = CanonicalValue::Date(at).to_json();
        assert_eq!(value, json!({"$date": "2015-08-01T00:00:00.000Z"}));
        assert_eq!(ValueType::of(&value), ValueType::Date);
    }

    #[test]
    fn test_date_display_matches_stored_form() {
        let at = Utc.with_ymd_and_hms(2015, 9, 16, 8, 34, 43).unwrap();
        let value = CanonicalValue::Date(at);
        assert_eq!(value.to_string(), "2015-09-16T08:34:43.000Z");
        assert_eq!(value.to_json(), json!({"$date": value.to_string()}));
    }

    #[test]
    fn test_write_model_addresses_by_id() {
        let instruction =
            UpdateInstruction::set(json!({"$oid": "abc"}), "imdb.rating", CanonicalValue::Int(7));
        assert_eq!(
            instruction.to_write_model(),
            json!({
                "updateOne": {
                    "filter": {"_id": {"$oid": "abc"}},
                    "update": {"$set": {"imdb.rating": 7}}
                }
            })
        );
    }

    #[test]
    fn test_bulk_write_options_default_is_ordered() {
        assert!(BulkWriteOptions::default().ordered);
        assert!(!BulkWriteOptions::unordered().ordered);
    }
}
