//! In-memory record source for testing and simple use cases.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::RecordSource;
use crate::{QueryArgs, Record, StorageError};

/// In-memory record collection.
///
/// Records are kept in insertion order, which is also the paging order.
/// Filters in [`QueryArgs::filters`] match by equality against top-level
/// fields of [`Record::data`]; a record lacking a filtered field never matches.
///
/// # Cloning
///
/// Cloning creates a new handle to the **same** underlying collection, so a
/// job callback can hold a clone and insert or delete records mid-run.
#[derive(Clone, Default)]
pub struct MemorySource {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySource {
    /// Create a new empty memory source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-populated with `records`, in order.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records.into_iter().collect())),
        }
    }

    /// Append one record.
    pub async fn insert(&self, record: Record) {
        self.records.lock().await.push(record);
    }

    /// Remove a record by id. Returns `true` if it was present.
    pub async fn remove(&self, id: &str) -> bool {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| record.id != id);
        records.len() != before
    }

    /// Get a copy of a record by id.
    pub async fn get(&self, id: &str) -> Option<Record> {
        self.records
            .lock()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Replace a record's payload in place. Returns `true` if it was present.
    pub async fn update(&self, id: &str, data: serde_json::Value) -> bool {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.data = data;
                true
            }
            None => false,
        }
    }

    /// Get the number of records, ignoring filters.
    #[must_use = "this returns the count, it doesn't modify the source"]
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Check if the source holds no records.
    #[must_use = "this returns a boolean, it doesn't modify the source"]
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

fn matches(record: &Record, args: &QueryArgs) -> bool {
    args.filters
        .iter()
        .all(|(key, value)| record.field(key) == Some(value))
}

impl RecordSource for MemorySource {
    async fn count(&self, args: &QueryArgs) -> Result<u64, StorageError> {
        let records = self.records.lock().await;
        Ok(records.iter().filter(|record| matches(record, args)).count() as u64)
    }

    async fn fetch_page(&self, args: &QueryArgs) -> Result<Vec<Record>, StorageError> {
        let records = self.records.lock().await;
        let offset = usize::try_from(args.offset)?;
        let limit = match args.page_size() {
            Some(n) => usize::try_from(n)?,
            None => usize::MAX,
        };

        Ok(records
            .iter()
            .filter(|record| matches(record, args))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
