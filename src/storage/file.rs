//! JSON file status store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::memory::remove_prefix;
use super::{StatusStore, StorageError};

/// Status store persisted to a single JSON file.
///
/// The whole map is loaded once by [`FileStore::open`] and rewritten after
/// every mutation. Writes go to a sibling temp file which is then renamed over
/// the target, so a crash never leaves a half-written file behind.
///
/// A mutation becomes visible to `get` only after its flush succeeded; a
/// failed write leaves both the file and the in-memory view unchanged.
///
/// Suitable for one process at a time; two processes opening the same file
/// will overwrite each other's changes. Every marker write rewrites the whole
/// file, so the cost of a job grows with the square of its record count: it
/// suits small collections and tests. Large collections want a
/// [`StatusStore`] over a real key/value store.
#[derive(Clone)]
pub struct FileStore {
    path: Arc<PathBuf>,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is treated as an empty store; it is created on the first
    /// write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path: Arc::new(path),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.path.as_path()).await?;
        Ok(())
    }
}

impl StatusStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        let removed = remove_prefix(&mut next, prefix);
        if removed > 0 {
            self.flush(&next).await?;
            *entries = next;
        }
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
