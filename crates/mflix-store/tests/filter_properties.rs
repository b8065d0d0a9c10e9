//! Property-based tests for filters and dotted paths.

use mflix_store::{Document, Filter, ValueType, get_path, set_path};
use proptest::prelude::*;
use serde_json::{Value, json};

// Strategy for generating field names (no dots)
fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_map(|s| s.to_string())
}

// Strategy for generating scalar JSON values of every classifiable type
fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,20}".prop_map(|s| json!(s)),
        any::<bool>().prop_map(|b| json!(b)),
        Just(Value::Null),
        Just(json!({"$date": "2015-08-01T00:00:00.000Z"})),
        Just(json!({"$oid": "573a1390f29313caabcd4135"})),
    ]
}

fn value_type() -> impl Strategy<Value = ValueType> {
    prop_oneof![
        Just(ValueType::Number),
        Just(ValueType::String),
        Just(ValueType::Date),
        Just(ValueType::ObjectId),
        Just(ValueType::Bool),
        Just(ValueType::Null),
    ]
}

proptest! {
    #[test]
    fn has_type_and_not_type_partition_documents(
        parent in field_name(),
        leaf in field_name(),
        value in proptest::option::of(scalar_value()),
        wanted in value_type(),
    ) {
        let mut doc = Document::new();
        doc.insert("_id".to_string(), json!(1));
        let path = format!("{}.{}", parent, leaf);
        if let Some(value) = value {
            set_path(&mut doc, &path, value).unwrap();
        }

        let has = Filter::has_type(path.clone(), wanted).matches(&doc);
        let not = Filter::not_type(path, wanted).matches(&doc);
        prop_assert_ne!(has, not);
    }

    #[test]
    fn set_then_get_returns_value(
        segments in prop::collection::vec(field_name(), 1..4),
        value in scalar_value(),
    ) {
        let mut doc = Document::new();
        let path = segments.join(".");
        set_path(&mut doc, &path, value.clone()).unwrap();
        prop_assert_eq!(get_path(&doc, &path), Some(&value));
        // A second identical set is not a modification
        prop_assert_eq!(set_path(&mut doc, &path, value), Ok(false));
    }
}
