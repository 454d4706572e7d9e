//! In-memory status store for testing and simple use cases.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{StatusStore, StorageError};

/// In-memory status store.
///
/// Entries live in an ordered map so prefix deletion is a range scan.
/// Progress does not outlive the process; use [`FileStore`](super::FileStore)
/// when a job must resume after a restart.
///
/// # Cloning
///
/// Cloning creates a new handle to the **same** underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored keys.
    #[must_use = "this returns the count, it doesn't modify the store"]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Check if the store is empty.
    #[must_use = "this returns a boolean, it doesn't modify the store"]
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

pub(super) fn remove_prefix(entries: &mut BTreeMap<String, String>, prefix: &str) -> u64 {
    let doomed: Vec<String> = entries
        .range(prefix.to_string()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &doomed {
        entries.remove(key);
    }
    doomed.len() as u64
}

impl StatusStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let mut entries = self.entries.lock().await;
        Ok(remove_prefix(&mut entries, prefix))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
