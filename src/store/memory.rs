//! In-memory store for tests, with a switch to simulate an outage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::models::{CycleState, PublishedEntry};
use crate::store::{Store, StoreError};

/// Store keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    published: Mutex<Vec<PublishedEntry>>,
    cycles: Mutex<HashMap<String, CycleState>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_published(&self, pmid: &str) -> Result<Option<PublishedEntry>, StoreError> {
        self.check_available()?;
        let published = self.published.lock().unwrap();
        Ok(published.iter().find(|entry| entry.pmid == pmid).cloned())
    }

    async fn append_published(&self, entry: PublishedEntry) -> Result<(), StoreError> {
        self.check_available()?;
        self.published.lock().unwrap().push(entry);
        Ok(())
    }

    async fn all_published(&self) -> Result<Vec<PublishedEntry>, StoreError> {
        self.check_available()?;
        Ok(self.published.lock().unwrap().clone())
    }

    async fn rewrite_published(&self, entries: Vec<PublishedEntry>) -> Result<(), StoreError> {
        self.check_available()?;
        *self.published.lock().unwrap() = entries;
        Ok(())
    }

    async fn last_cycle(&self, label: &str) -> Result<Option<CycleState>, StoreError> {
        self.check_available()?;
        Ok(self.cycles.lock().unwrap().get(label).cloned())
    }

    async fn upsert_cycle(&self, state: CycleState) -> Result<(), StoreError> {
        self.check_available()?;
        self.cycles.lock().unwrap().insert(state.label.clone(), state);
        Ok(())
    }
}
