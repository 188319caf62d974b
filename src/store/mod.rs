//! Persistent state access: published-article entries and the cycle marker.
//!
//! The [`Store`] trait covers the two record kinds the system persists.
//! [`DedupeStore`] sits on top of it and is the only dedupe surface the
//! coordinator uses; it filters by article identifier. Text-keyed lookup is
//! a legacy concern that survives only as input to the one-shot backfill in
//! [`crate::migrate`].

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{CycleState, PublishedEntry};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot be reached. Fatal for the current cycle
    /// only: the coordinator aborts and retries on a later scheduled run.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Key-value/record access over the two persisted record kinds.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Find a published entry by article identifier.
    async fn find_published(&self, pmid: &str) -> Result<Option<PublishedEntry>, StoreError>;

    /// Append a newly published entry.
    async fn append_published(&self, entry: PublishedEntry) -> Result<(), StoreError>;

    /// All published entries, oldest first.
    async fn all_published(&self) -> Result<Vec<PublishedEntry>, StoreError>;

    /// Replace the whole published set. Used only by the legacy identifier
    /// backfill; ordinary operation never rewrites entries.
    async fn rewrite_published(&self, entries: Vec<PublishedEntry>) -> Result<(), StoreError>;

    /// Last completed cycle for the given task label.
    async fn last_cycle(&self, label: &str) -> Result<Option<CycleState>, StoreError>;

    /// Create or overwrite the cycle marker for its label.
    async fn upsert_cycle(&self, state: CycleState) -> Result<(), StoreError>;
}

/// Identifier-keyed dedupe over a [`Store`].
///
/// The coordinator only reads and appends; entries are never mutated.
#[derive(Debug, Clone)]
pub struct DedupeStore {
    store: Arc<dyn Store>,
}

impl DedupeStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Whether this article identifier has already been published.
    pub async fn is_published(&self, pmid: &str) -> Result<bool, StoreError> {
        Ok(self.store.find_published(pmid).await?.is_some())
    }

    /// Record a successful publish. Called exactly once per article, at the
    /// moment the publish attempt succeeds.
    pub async fn record(
        &self,
        pmid: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store
            .append_published(PublishedEntry::new(pmid, text, at))
            .await
    }

    /// All published texts. Legacy text-keyed surface: kept for the backfill
    /// migration, not for dedupe decisions.
    pub async fn published_texts(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .all_published()
            .await?
            .into_iter()
            .map(|entry| entry.text)
            .collect())
    }
}
