//! Scan one rule's matches and collect the instructions they produce.

use futures_util::TryStreamExt;
use mflix_store::{Document, DocumentStore, UpdateInstruction, record_id};
use tracing::{info, warn};

use crate::transform::describe_id;
use crate::{MigrateError, MigrationRule, TransformError};

/// Instructions gathered across every rule before anything is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    instructions: Vec<UpdateInstruction>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: UpdateInstruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpdateInstruction> {
        self.instructions.iter()
    }

    pub fn into_instructions(self) -> Vec<UpdateInstruction> {
        self.instructions
    }
}

/// What planning one rule found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    pub rule: &'static str,
    /// Records returned by the rule's filter.
    pub scanned: usize,
    /// Instructions appended to the batch.
    pub planned: usize,
    /// Matched records that needed no change.
    pub unchanged: usize,
    /// Why each left-out record could not be transformed, in discovery order.
    pub skipped: Vec<TransformError>,
}

/// Query `collection` with the rule's filter and append an instruction for
/// every record the rule can fix.
///
/// Discovery order is kept within the rule. Nothing is written. A store
/// error while streaming ends planning; a transform error only skips the
/// record.
pub async fn plan_rule(
    store: &dyn DocumentStore,
    collection: &str,
    rule: &dyn MigrationRule,
    batch: &mut Batch,
) -> Result<PlanReport, MigrateError> {
    let filter = rule.filter();
    let mut records = store.find(collection, &filter);

    let mut report = PlanReport {
        rule: rule.name(),
        scanned: 0,
        planned: 0,
        unchanged: 0,
        skipped: Vec::new(),
    };

    while let Some(doc) = records.try_next().await? {
        report.scanned += 1;

        match rule.transform(&doc) {
            Ok(Some(instruction)) => {
                batch.push(instruction);
                report.planned += 1;
            }
            Ok(None) => report.unchanged += 1,
            Err(err) => {
                log_skip(rule, &doc, &err);
                report.skipped.push(err);
            }
        }
    }

    info!(
        rule = report.rule,
        collection,
        scanned = report.scanned,
        planned = report.planned,
        unchanged = report.unchanged,
        skipped = report.skipped.len(),
        "planned rule"
    );

    Ok(report)
}

fn log_skip(rule: &dyn MigrationRule, doc: &Document, err: &TransformError) {
    let id = record_id(doc).map(describe_id);
    warn!(
        rule = rule.name(),
        id = id.as_deref().unwrap_or("<none>"),
        raw = err.raw().unwrap_or(""),
        error = %err,
        "skipping record that could not be transformed"
    );
}
