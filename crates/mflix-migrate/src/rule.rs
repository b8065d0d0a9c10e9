//! Migration rules: a filter that finds offending records paired with the
//! transform that fixes one of them.

use mflix_store::{Document, Filter, UpdateInstruction, ValueType};

use crate::transform::{normalize_rating, normalize_timestamp};
use crate::{MigrationConfig, TransformError};

/// One category of data correction.
///
/// A rule never writes; it only proposes instructions for the planner.
pub trait MigrationRule: Send + Sync {
    /// Unique name for this rule.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Selects records whose target field is not yet canonical.
    fn filter(&self) -> Filter;

    /// Propose an update for one matched record.
    fn transform(&self, doc: &Document) -> Result<Option<UpdateInstruction>, TransformError>;
}

// =============================================================================
// Rule: Rating Text to Number
// =============================================================================

/// Converts ratings stored as text into integers.
pub struct RatingToNumber {
    path: String,
}

impl RatingToNumber {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl MigrationRule for RatingToNumber {
    fn name(&self) -> &'static str {
        "rating-to-number"
    }

    fn description(&self) -> &'static str {
        "Convert non-numeric ratings into integers (empty text becomes 0)"
    }

    fn filter(&self) -> Filter {
        Filter::not_type(self.path.clone(), ValueType::Number)
    }

    fn transform(&self, doc: &Document) -> Result<Option<UpdateInstruction>, TransformError> {
        normalize_rating(doc, &self.path)
    }
}

// =============================================================================
// Rule: Timestamp Text to Date
// =============================================================================

/// Converts timestamps stored as formatted text into dates.
pub struct TimestampToDate {
    path: String,
    format: String,
}

impl TimestampToDate {
    pub fn new(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
        }
    }
}

impl MigrationRule for TimestampToDate {
    fn name(&self) -> &'static str {
        "timestamp-to-date"
    }

    fn description(&self) -> &'static str {
        "Convert text timestamps into dates"
    }

    fn filter(&self) -> Filter {
        Filter::has_type(self.path.clone(), ValueType::String)
    }

    fn transform(&self, doc: &Document) -> Result<Option<UpdateInstruction>, TransformError> {
        normalize_timestamp(doc, &self.path, &self.format)
    }
}

// =============================================================================
// Rule Registry
// =============================================================================

/// The built-in rules, in the order they are planned.
pub fn builtin_rules(config: &MigrationConfig) -> Vec<Box<dyn MigrationRule>> {
    vec![
        Box::new(TimestampToDate::new(
            config.timestamp_path.clone(),
            config.timestamp_format.clone(),
        )),
        Box::new(RatingToNumber::new(config.rating_path.clone())),
    ]
}
