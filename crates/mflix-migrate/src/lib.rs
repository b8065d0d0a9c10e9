//! Dataset cleanup migration for the mflix movies collection.
//!
//! This crate finds records whose fields were stored with the wrong type
//! and fixes them in one pass:
//! - Each rule queries the store for records its field filter selects
//! - Each record is transformed on its own; a bad value skips only that record
//! - All instructions land in one batch, applied as a single unordered bulk write
//!
//! Built-in rules convert text timestamps into dates and text ratings into
//! integers. Additional rules implement [`MigrationRule`].

mod config;
mod driver;
mod error;
mod executor;
mod planner;
mod rule;
pub mod transform;

pub use config::{
    DEFAULT_COLLECTION, DEFAULT_RATING_PATH, DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMESTAMP_PATH,
    MigrationConfig,
};
pub use driver::{MigrationOutcome, Migrator};
pub use error::{MigrateError, TransformError};
pub use executor::{Execution, execute};
pub use planner::{Batch, PlanReport, plan_rule};
pub use rule::{MigrationRule, RatingToNumber, TimestampToDate, builtin_rules};
