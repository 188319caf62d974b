//! Persisted record kinds: published articles and the cycle marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label for the single recurring task. There is only one topic in this
/// design, so the cycle marker is keyed by this fixed label.
pub const CYCLE_LABEL: &str = "announce";

/// An article that was successfully published, with the exact text that went
/// out. Created once at the moment a publish attempt succeeds; never mutated
/// afterwards (the legacy backfill is the sole, documented exception).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    /// Article identifier. Empty only for entries written by the legacy
    /// text-keyed lineage, until the backfill runs.
    #[serde(default)]
    pub pmid: String,

    /// The exact text that was published
    pub text: String,

    /// When the publish succeeded
    pub published_at: DateTime<Utc>,
}

impl PublishedEntry {
    pub fn new(pmid: impl Into<String>, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            pmid: pmid.into(),
            text: text.into(),
            published_at: at,
        }
    }
}

/// Completion marker for one recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    /// Task label, see [`CYCLE_LABEL`]
    pub label: String,

    /// Start timestamp of the last completed cycle
    pub completed_at: DateTime<Utc>,
}

impl CycleState {
    pub fn new(label: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            label: label.into(),
            completed_at,
        }
    }
}
