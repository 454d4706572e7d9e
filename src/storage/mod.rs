//! Status store backends for job progress and per-record markers.
//!
//! This module provides:
//! - [`StatusStore`] trait - Key/value contract every backend implements
//! - [`MemoryStore`] - In-memory store for testing and single-process use
//! - [`FileStore`] - JSON file store that survives process restarts
//! - [`Ledger`] - Typed access to the job keys kept in a store

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

mod file;
mod ledger;
mod memory;

pub use file::FileStore;
pub(crate) use ledger::Ledger;
pub use memory::MemoryStore;

/// Shared error type used by stores, sources and callbacks.
pub type StorageError = Box<dyn Error + Send + Sync + 'static>;

/// Trait for status store backends.
///
/// Keys are flat strings namespaced per job
/// (`job:{identifier}:progress`, `job:{identifier}:record:{id}:status`), so a
/// backend only needs point reads, point writes and prefix deletion.
///
/// The runner never issues two calls against the same job concurrently, but
/// different jobs may share one store.
///
/// # Example
///
/// ```rust,no_run
/// use fast_batch_runner::{MemoryStore, StatusStore, StorageError};
///
/// # async fn example() -> Result<(), StorageError> {
/// let store = MemoryStore::new();
/// store.set("job:demo:progress", "{}".to_string()).await?;
/// assert!(store.get("job:demo:progress").await?.is_some());
/// store.delete_prefix("job:demo:").await?;
/// # Ok(())
/// # }
/// ```
pub trait StatusStore: Send + Sync + 'static {
    /// Read one value. Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write one value, replacing any previous one.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove every key starting with `prefix`, returning how many were removed.
    fn delete_prefix(&self, prefix: &str)
    -> impl Future<Output = Result<u64, StorageError>> + Send;
}

impl<InnerStore> StatusStore for Arc<InnerStore>
where
    InnerStore: StatusStore,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        self.as_ref().get(key)
    }

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        self.as_ref().set(key, value)
    }

    fn delete_prefix(&self, prefix: &str) -> impl Future<Output = Result<u64, StorageError>> + Send {
        self.as_ref().delete_prefix(prefix)
    }
}
