//! Typed view over the keys one job owns in a [`StatusStore`].

use tracing::debug;

use super::StatusStore;
use crate::BatchError;
use crate::status::{JobProgress, RecordStatus};

/// Key builder and typed accessors for a single job.
///
/// Layout, with the default `job` namespace:
///
/// ```text
/// job:{identifier}:progress                  -> JSON JobProgress
/// job:{identifier}:record:{record_id}:status -> "success"
/// ```
pub(crate) struct Ledger<'a, S> {
    store: &'a S,
    namespace: &'a str,
    identifier: &'a str,
}

impl<'a, S: StatusStore> Ledger<'a, S> {
    pub(crate) fn new(store: &'a S, namespace: &'a str, identifier: &'a str) -> Self {
        Self {
            store,
            namespace,
            identifier,
        }
    }

    pub(crate) fn job_prefix(&self) -> String {
        format!("{}:{}:", self.namespace, self.identifier)
    }

    pub(crate) fn progress_key(&self) -> String {
        format!("{}progress", self.job_prefix())
    }

    pub(crate) fn record_prefix(&self) -> String {
        format!("{}record:", self.job_prefix())
    }

    pub(crate) fn record_key(&self, record_id: &str) -> String {
        format!("{}{record_id}:status", self.record_prefix())
    }

    pub(crate) async fn load_progress(&self) -> Result<Option<JobProgress>, BatchError> {
        let raw = self
            .store
            .get(&self.progress_key())
            .await
            .map_err(BatchError::Store)?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| BatchError::CorruptProgress {
                identifier: self.identifier.to_string(),
                source,
            })
        })
        .transpose()
    }

    pub(crate) async fn save_progress(&self, progress: &JobProgress) -> Result<(), BatchError> {
        let raw = serde_json::to_string(progress).map_err(|source| BatchError::CorruptProgress {
            identifier: self.identifier.to_string(),
            source,
        })?;
        self.store
            .set(&self.progress_key(), raw)
            .await
            .map_err(BatchError::Store)
    }

    pub(crate) async fn record_status(&self, record_id: &str) -> Result<RecordStatus, BatchError> {
        let raw = self
            .store
            .get(&self.record_key(record_id))
            .await
            .map_err(BatchError::Store)?;
        Ok(RecordStatus::from_stored(raw.as_deref()))
    }

    pub(crate) async fn mark_success(&self, record_id: &str) -> Result<(), BatchError> {
        self.store
            .set(&self.record_key(record_id), RecordStatus::SUCCESS.to_string())
            .await
            .map_err(BatchError::Store)
    }

    /// Drop every record marker of the job, returning how many were removed.
    pub(crate) async fn clear_markers(&self) -> Result<u64, BatchError> {
        let removed = self
            .store
            .delete_prefix(&self.record_prefix())
            .await
            .map_err(BatchError::Store)?;
        debug!(job = %self.identifier, removed, "Cleared record markers");
        Ok(removed)
    }

    /// Drop progress and markers of the job.
    pub(crate) async fn wipe(&self) -> Result<u64, BatchError> {
        self.store
            .delete_prefix(&self.job_prefix())
            .await
            .map_err(BatchError::Store)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::JobStatus;
    use crate::{MemoryStore, StatusStore};

    #[test]
    fn keys_follow_job_layout() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store, "job", "hey-there");

        assert_eq!(ledger.progress_key(), "job:hey-there:progress");
        assert_eq!(ledger.record_key("42"), "job:hey-there:record:42:status");
        assert_eq!(ledger.record_prefix(), "job:hey-there:record:");
    }

    #[tokio::test]
    async fn progress_round_trips_through_store() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store, "job", "demo");
        assert_eq!(ledger.load_progress().await.unwrap(), None);

        let mut progress = JobProgress::start(5);
        progress.total_results = 10;
        ledger.save_progress(&progress).await.unwrap();

        assert_eq!(ledger.load_progress().await.unwrap(), Some(progress));
    }

    #[tokio::test]
    async fn corrupt_progress_is_reported() {
        let store = MemoryStore::new();
        store.set("job:demo:progress", "{oops".into()).await.unwrap();

        let ledger = Ledger::new(&store, "job", "demo");
        match ledger.load_progress().await {
            Err(BatchError::CorruptProgress { identifier, .. }) => assert_eq!(identifier, "demo"),
            other => panic!("Expected corrupt progress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mark_success_is_readable() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store, "job", "demo");
        assert_eq!(ledger.record_status("1").await.unwrap(), RecordStatus::Unprocessed);

        ledger.mark_success("1").await.unwrap();
        assert_eq!(ledger.record_status("1").await.unwrap(), RecordStatus::Success);
        assert_eq!(
            store.get("job:demo:record:1:status").await.unwrap().as_deref(),
            Some("success")
        );
    }

    #[tokio::test]
    async fn clear_markers_keeps_progress() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store, "job", "demo");
        ledger.save_progress(&JobProgress::start(0)).await.unwrap();
        ledger.mark_success("1").await.unwrap();
        ledger.mark_success("2").await.unwrap();

        assert_eq!(ledger.clear_markers().await.unwrap(), 2);
        let progress = ledger.load_progress().await.unwrap().unwrap();
        assert_eq!(progress.status, JobStatus::Running);

        assert_eq!(ledger.wipe().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }
}
