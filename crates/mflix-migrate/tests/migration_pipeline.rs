//! End-to-end migration runs against in-process stores.

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use mflix_migrate::{
    MigrateError, MigrationConfig, MigrationOutcome, MigrationRule, Migrator, TransformError,
};
use mflix_store::{
    BatchResult, BulkWriteOptions, CanonicalValue, Document, DocumentStore, DocumentStream,
    Filter, MemoryStore, StoreError, UpdateInstruction, ValueType, get_path, record_id,
};
use serde_json::{Value, json};

const MOVIES: &str = "movies";

fn migrator() -> Migrator {
    Migrator::new(MigrationConfig::default()).unwrap()
}

async fn store_with(docs: Vec<Value>) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_many(MOVIES, docs).await.unwrap();
    store
}

mod full_pipeline {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn single_record_gets_both_fields_fixed() {
        let store = store_with(vec![json!({
            "_id": "A",
            "imdb": {"rating": "6"},
            "lastupdated": "2015-08-01 00:00:00"
        })])
        .await;

        let outcome = migrator().run(&store).await.unwrap();
        assert_eq!(outcome.to_string(), "Updated 1 documents");

        let a = store.get(MOVIES, &json!("A")).await.unwrap();
        assert_eq!(get_path(&a, "imdb.rating"), Some(&json!(6)));
        assert_eq!(
            get_path(&a, "lastupdated"),
            Some(&json!({"$date": "2015-08-01T00:00:00.000Z"}))
        );
    }

    #[tokio::test]
    async fn second_run_has_nothing_to_update() {
        let store = store_with(vec![
            json!({"_id": 1, "imdb": {"rating": "7"}, "lastupdated": "2015-08-01 00:00:00"}),
            json!({"_id": 2, "imdb": {"rating": ""}, "lastupdated": "2015-09-16 08:34:43.187000000"}),
            json!({"_id": 3, "imdb": {"rating": 8.1}}),
        ])
        .await;

        let first = migrator().run(&store).await.unwrap();
        assert!(matches!(first, MigrationOutcome::Updated(ref r) if r.modified == 2));
        assert_eq!(store.bulk_write_calls(), 1);

        let second = migrator().run(&store).await.unwrap();
        assert_eq!(second, MigrationOutcome::NothingToUpdate);
        assert_eq!(second.to_string(), "Nothing to update!");
        assert_eq!(store.bulk_write_calls(), 1);
    }

    #[tokio::test]
    async fn malformed_values_are_skipped_not_fatal() {
        let store = store_with(vec![
            json!({"_id": "bad-rating", "imdb": {"rating": "N/A"}}),
            json!({"_id": "bad-date", "lastupdated": "2015/09/01"}),
            json!({"_id": "good", "imdb": {"rating": "5"}}),
        ])
        .await;

        let outcome = migrator().run(&store).await.unwrap();
        match outcome {
            MigrationOutcome::Updated(result) => {
                assert_eq!(result.modified, 1);
                assert!(result.is_clean());
            }
            other => panic!("expected update, got {:?}", other),
        }

        let bad = store.get(MOVIES, &json!("bad-rating")).await.unwrap();
        assert_eq!(get_path(&bad, "imdb.rating"), Some(&json!("N/A")));
        let bad = store.get(MOVIES, &json!("bad-date")).await.unwrap();
        assert_eq!(get_path(&bad, "lastupdated"), Some(&json!("2015/09/01")));
    }

    #[tokio::test]
    async fn only_malformed_values_means_nothing_to_update() {
        let store = store_with(vec![json!({"_id": 1, "imdb": {"rating": "N/A"}})]).await;

        let outcome = migrator().run(&store).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::NothingToUpdate);
        assert_eq!(store.bulk_write_calls(), 0);
    }

    #[tokio::test]
    async fn empty_collection_never_writes() {
        let store = MemoryStore::new();
        let outcome = migrator().run(&store).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::NothingToUpdate);
        assert_eq!(store.bulk_write_calls(), 0);
    }

    #[tokio::test]
    async fn item_failures_are_reported_with_the_rest_applied() {
        // `imdb` is text here, so `$set imdb.rating` cannot create the field.
        let store = store_with(vec![
            json!({"_id": "ok", "imdb": {"rating": "4"}}),
            json!({"_id": "broken", "imdb": "tt0000001", "lastupdated": "2015-08-01 00:00:00"}),
        ])
        .await;

        // Force an instruction against the scalar parent through a custom rule.
        let m = migrator().with_rule(ForceRating("broken"));
        let outcome = m.run(&store).await.unwrap();

        match outcome {
            MigrationOutcome::Updated(result) => {
                assert_eq!(result.modified, 2);
                assert_eq!(result.failures.len(), 1);
                assert_eq!(result.failures[0].id, Some(json!("broken")));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }
}

mod dry_run {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let store = store_with(vec![
            json!({"_id": "A", "imdb": {"rating": "6"}, "lastupdated": "2015-08-01 00:00:00"}),
        ])
        .await;

        let outcome = migrator().dry_run(&store).await.unwrap();
        match &outcome {
            MigrationOutcome::Planned(batch) => {
                let paths: Vec<&str> = batch.iter().map(|i| i.path.as_str()).collect();
                assert_eq!(paths, vec!["lastupdated", "imdb.rating"]);
            }
            other => panic!("expected plan, got {:?}", other),
        }
        assert_eq!(outcome.to_string(), "Dry-run: 2 update(s) planned");
        assert_eq!(store.bulk_write_calls(), 0);

        let a = store.get(MOVIES, &json!("A")).await.unwrap();
        assert_eq!(get_path(&a, "imdb.rating"), Some(&json!("6")));
    }

    #[tokio::test]
    async fn plan_reports_per_rule_counts() {
        let store = store_with(vec![
            json!({"_id": 1, "imdb": {"rating": "6"}, "lastupdated": "bogus"}),
            json!({"_id": 2, "imdb": {"rating": 7}}),
        ])
        .await;

        let (batch, reports) = migrator().plan(&store).await.unwrap();
        assert_eq!(batch.len(), 1);

        let summary: Vec<(&str, usize, usize, usize)> = reports
            .iter()
            .map(|r| (r.rule, r.scanned, r.planned, r.skipped.len()))
            .collect();
        assert_eq!(
            summary,
            vec![("timestamp-to-date", 1, 0, 1), ("rating-to-number", 1, 1, 0)]
        );
    }
}

mod extension {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Converts a numeric-looking `year` stored as text.
    struct YearToNumber;

    impl MigrationRule for YearToNumber {
        fn name(&self) -> &'static str {
            "year-to-number"
        }

        fn description(&self) -> &'static str {
            "Convert text years into integers"
        }

        fn filter(&self) -> Filter {
            Filter::has_type("year", ValueType::String)
        }

        fn transform(&self, doc: &Document) -> Result<Option<UpdateInstruction>, TransformError> {
            let id = record_id(doc).ok_or(TransformError::MissingId)?;
            let year = get_path(doc, "year")
                .and_then(Value::as_str)
                .and_then(|s| s.get(..4))
                .and_then(|s| s.parse().ok());
            Ok(year.map(|y| UpdateInstruction::set(id.clone(), "year", CanonicalValue::Int(y))))
        }
    }

    #[tokio::test]
    async fn registered_rules_share_the_batch() {
        let store = store_with(vec![
            json!({"_id": 1, "year": "1995è", "imdb": {"rating": "8"}}),
            json!({"_id": 2, "year": 1996}),
        ])
        .await;

        let m = migrator().with_rule(YearToNumber);
        let names: Vec<&str> = m.rules().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["timestamp-to-date", "rating-to-number", "year-to-number"]
        );

        let outcome = m.run(&store).await.unwrap();
        assert!(matches!(outcome, MigrationOutcome::Updated(ref r) if r.modified == 1));
        assert_eq!(store.bulk_write_calls(), 1);

        let one = store.get(MOVIES, &json!(1)).await.unwrap();
        assert_eq!(get_path(&one, "year"), Some(&json!(1995)));
        assert_eq!(get_path(&one, "imdb.rating"), Some(&json!(8)));
    }
}

mod store_failures {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Store whose every call fails.
    struct Unreachable;

    #[async_trait]
    impl DocumentStore for Unreachable {
        fn find<'a>(&'a self, _collection: &'a str, _filter: &'a Filter) -> DocumentStream<'a> {
            stream::once(async {
                Err::<Document, _>(StoreError::InvalidResponse(
                    "connection refused".to_string(),
                ))
            })
            .boxed()
        }

        async fn bulk_write(
            &self,
            _collection: &str,
            _instructions: Vec<UpdateInstruction>,
            _options: BulkWriteOptions,
        ) -> Result<BatchResult, StoreError> {
            Err(StoreError::InvalidResponse("connection refused".to_string()))
        }
    }

    /// Store that finds one fixable record but rejects the bulk write.
    struct RejectsWrites {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DocumentStore for RejectsWrites {
        fn find<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> DocumentStream<'a> {
            self.inner.find(collection, filter)
        }

        async fn bulk_write(
            &self,
            _collection: &str,
            _instructions: Vec<UpdateInstruction>,
            _options: BulkWriteOptions,
        ) -> Result<BatchResult, StoreError> {
            Err(StoreError::Server {
                status: 503,
                message: "not primary".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn query_failure_ends_the_run() {
        let result = migrator().run(&Unreachable).await;
        assert!(matches!(result, Err(MigrateError::Store(_))));
    }

    #[tokio::test]
    async fn bulk_write_failure_ends_the_run() {
        let store = RejectsWrites {
            inner: store_with(vec![json!({"_id": 1, "imdb": {"rating": "3"}})]).await,
        };
        let result = migrator().run(&store).await;
        match result {
            Err(MigrateError::Store(StoreError::Server { status, .. })) => assert_eq!(status, 503),
            other => panic!("expected store error, got {:?}", other),
        }
    }
}

/// Proposes a rating of 1 for one fixed `_id`, whatever the record holds.
struct ForceRating(&'static str);

impl MigrationRule for ForceRating {
    fn name(&self) -> &'static str {
        "force-rating"
    }

    fn description(&self) -> &'static str {
        "Set imdb.rating on one record"
    }

    fn filter(&self) -> Filter {
        Filter::has_type("_id", ValueType::String)
    }

    fn transform(&self, doc: &Document) -> Result<Option<UpdateInstruction>, TransformError> {
        Ok(record_id(doc)
            .filter(|id| *id == &json!(self.0))
            .map(|id| UpdateInstruction::set(id.clone(), "imdb.rating", CanonicalValue::Int(1))))
    }
}
