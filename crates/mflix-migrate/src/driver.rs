//! Migration driver: one pass, one batch, one write.

use std::fmt;

use mflix_store::{BatchResult, DocumentStore};
use tracing::info;

use crate::executor::{Execution, execute};
use crate::planner::{Batch, PlanReport, plan_rule};
use crate::rule::{MigrationRule, builtin_rules};
use crate::{MigrateError, MigrationConfig};

/// Terminal result of a migration run.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// No rule produced an instruction; nothing was written.
    NothingToUpdate,
    /// The batch was written.
    Updated(BatchResult),
    /// Dry-run: the batch that would have been written.
    Planned(Batch),
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToUpdate => f.write_str("Nothing to update!"),
            Self::Updated(result) => write!(f, "Updated {} documents", result.modified),
            Self::Planned(batch) => write!(f, "Dry-run: {} update(s) planned", batch.len()),
        }
    }
}

/// Runs the registered rules against one collection.
pub struct Migrator {
    config: MigrationConfig,
    rules: Vec<Box<dyn MigrationRule>>,
}

impl Migrator {
    /// Create a migrator with the built-in rules registered.
    pub fn new(config: MigrationConfig) -> Result<Self, MigrateError> {
        config.validate()?;
        let rules = builtin_rules(&config);
        Ok(Self { config, rules })
    }

    /// Register an additional rule, planned after those already registered.
    pub fn register(&mut self, rule: Box<dyn MigrationRule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: impl MigrationRule + 'static) -> Self {
        self.register(Box::new(rule));
        self
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn MigrationRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Plan every rule into one batch. Reads only.
    pub async fn plan(
        &self,
        store: &dyn DocumentStore,
    ) -> Result<(Batch, Vec<PlanReport>), MigrateError> {
        let mut batch = Batch::new();
        let mut reports = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let report =
                plan_rule(store, &self.config.collection, rule.as_ref(), &mut batch).await?;
            reports.push(report);
        }

        Ok((batch, reports))
    }

    /// Plan every rule, then apply the batch with a single bulk write.
    pub async fn run(&self, store: &dyn DocumentStore) -> Result<MigrationOutcome, MigrateError> {
        let (batch, _) = self.plan(store).await?;
        info!(
            collection = %self.config.collection,
            rules = self.rules.len(),
            instructions = batch.len(),
            "planning complete"
        );

        match execute(store, &self.config.collection, batch).await? {
            Execution::NothingToUpdate => Ok(MigrationOutcome::NothingToUpdate),
            Execution::Applied(result) => Ok(MigrationOutcome::Updated(result)),
        }
    }

    /// Plan every rule without writing anything.
    pub async fn dry_run(
        &self,
        store: &dyn DocumentStore,
    ) -> Result<MigrationOutcome, MigrateError> {
        let (batch, _) = self.plan(store).await?;
        if batch.is_empty() {
            return Ok(MigrationOutcome::NothingToUpdate);
        }
        Ok(MigrationOutcome::Planned(batch))
    }
}
