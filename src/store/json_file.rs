//! File-backed store keeping all state in one JSON document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::{CycleState, PublishedEntry};
use crate::store::{Store, StoreError};

/// On-disk document. The published list is append-only in normal operation;
/// cycle markers are keyed by task label.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    published: Vec<PublishedEntry>,

    #[serde(default)]
    cycles: HashMap<String, CycleState>,
}

/// Store persisting to a single JSON file.
///
/// State is held in memory and flushed to disk on every write, so a crash
/// between cycles loses nothing already recorded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open a store at the given path, loading existing state if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoreData::default()
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Default location under the user data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pubmed-herald")
            .join("state.json")
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreData>, StoreError> {
        self.data
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn find_published(&self, pmid: &str) -> Result<Option<PublishedEntry>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .published
            .iter()
            .find(|entry| entry.pmid == pmid)
            .cloned())
    }

    async fn append_published(&self, entry: PublishedEntry) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        data.published.push(entry);
        self.persist(&data)
    }

    async fn all_published(&self) -> Result<Vec<PublishedEntry>, StoreError> {
        let data = self.lock()?;
        Ok(data.published.clone())
    }

    async fn rewrite_published(&self, entries: Vec<PublishedEntry>) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        data.published = entries;
        self.persist(&data)
    }

    async fn last_cycle(&self, label: &str) -> Result<Option<CycleState>, StoreError> {
        let data = self.lock()?;
        Ok(data.cycles.get(label).cloned())
    }

    async fn upsert_cycle(&self, state: CycleState) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        data.cycles.insert(state.label.clone(), state);
        self.persist(&data)
    }
}
