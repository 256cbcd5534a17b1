// In-memory entity store with conditional updates

mod engine;
mod query;

pub use engine::EntityStore;
pub use query::QueryFacade;

use chrono::{DateTime, Utc};
use std::fmt;

/// Store-level outcomes of lookups and conditional updates
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No entity (or no beach with the sensor) matched the key
    NotFound(String),
    /// Observation is not newer than the entity's last modification
    StaleUpdate {
        entity_id: String,
        observed_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "no entity found matching {}", key),
            StoreError::StaleUpdate {
                entity_id,
                observed_at,
                last_modified,
            } => write!(
                f,
                "ignored update of {} observed at {} that predates last modification {}",
                entity_id,
                observed_at.to_rfc3339(),
                last_modified.to_rfc3339()
            ),
        }
    }
}

impl std::error::Error for StoreError {}
