//! Single-field type predicates.

use serde_json::{Value, json};

use crate::document::{Document, ValueType, get_path};

/// Selects documents by the type of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Field is present and holds a value of the given type.
    HasType { path: String, value_type: ValueType },
    /// Field is absent or holds a value of another type.
    NotType { path: String, value_type: ValueType },
}

impl Filter {
    pub fn has_type(path: impl Into<String>, value_type: ValueType) -> Self {
        Self::HasType {
            path: path.into(),
            value_type,
        }
    }

    pub fn not_type(path: impl Into<String>, value_type: ValueType) -> Self {
        Self::NotType {
            path: path.into(),
            value_type,
        }
    }

    /// The field path this filter inspects.
    pub fn path(&self) -> &str {
        match self {
            Self::HasType { path, .. } | Self::NotType { path, .. } => path,
        }
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::HasType { path, value_type } => {
                get_path(doc, path).is_some_and(|v| ValueType::of(v) == *value_type)
            }
            Self::NotType { path, value_type } => {
                !get_path(doc, path).is_some_and(|v| ValueType::of(v) == *value_type)
            }
        }
    }

    /// Query-language form, e.g. `{"imdb.rating": {"$not": {"$type": "number"}}}`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::HasType { path, value_type } => {
                json!({ path.as_str(): { "$type": value_type.alias() } })
            }
            Self::NotType { path, value_type } => {
                json!({ path.as_str(): { "$not": { "$type": value_type.alias() } } })
            }
        }
    }
}
