//! Migration settings.

use serde::{Deserialize, Serialize};

use crate::MigrateError;

/// Collection used by the mflix sample dataset.
pub const DEFAULT_COLLECTION: &str = "movies";
/// Raw rating field.
pub const DEFAULT_RATING_PATH: &str = "imdb.rating";
/// Raw timestamp field.
pub const DEFAULT_TIMESTAMP_PATH: &str = "lastupdated";
/// Layout of timestamps stored as text (`yyyy-MM-dd HH:mm:ss`).
///
/// Most rows carry a fractional suffix (`2015-09-16 08:34:43.187000000`);
/// see [`crate::transform::parse_timestamp`] for how it is treated.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the migration looks and how it parses what it finds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub collection: String,
    pub rating_path: String,
    pub timestamp_path: String,
    /// chrono format string for text timestamps, interpreted as UTC.
    pub timestamp_format: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            rating_path: DEFAULT_RATING_PATH.to_string(),
            timestamp_path: DEFAULT_TIMESTAMP_PATH.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Default settings against another collection.
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Reject settings that could never address a field.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.collection.is_empty() {
            return Err(MigrateError::InvalidConfig(
                "collection must not be empty".to_string(),
            ));
        }
        for (name, path) in [
            ("rating_path", &self.rating_path),
            ("timestamp_path", &self.timestamp_path),
        ] {
            if path.is_empty() || path.split('.').any(str::is_empty) {
                return Err(MigrateError::InvalidConfig(format!(
                    "{} '{}' is not a valid field path",
                    name, path
                )));
            }
        }
        if self.timestamp_format.is_empty() {
            return Err(MigrateError::InvalidConfig(
                "timestamp_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
