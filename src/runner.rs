//! Batch runner: processes one page of a registered job per call.

use std::collections::{BTreeMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::source::SourceList;
use crate::status::{JobProgress, JobStatus, ProgressReport, RecordStatus};
use crate::storage::Ledger;
use crate::{BatchError, JobDefinition, JobRegistry, RecordSource, StatusStore};

/// Configuration for the batch runner.
///
/// # Example
///
/// ```rust
/// use fast_batch_runner::BatchRunnerConfig;
///
/// // Use defaults
/// let config = BatchRunnerConfig::default();
///
/// // Or customize
/// let config = BatchRunnerConfig {
///     key_namespace: "loco_batch".to_string(),
///     reject_concurrent_runs: false,
/// };
/// ```
#[derive(Clone, Debug)]
pub struct BatchRunnerConfig {
    /// First segment of every status store key (`{namespace}:{identifier}:...`).
    ///
    /// Must be non-empty and must not contain `:`.
    pub key_namespace: String,

    /// Reject a `run()` for a job whose previous page is still in flight in
    /// this process.
    ///
    /// Progress is read, then written, without a transaction, so two pages of
    /// one job processed at once can corrupt the offset. This guard only covers
    /// a single process; schedulers in separate processes must not target the
    /// same job at the same time.
    pub reject_concurrent_runs: bool,
}

impl Default for BatchRunnerConfig {
    /// Returns a configuration with sensible defaults.
    ///
    /// - `key_namespace`: `"job"`
    /// - `reject_concurrent_runs`: `true`
    fn default() -> Self {
        Self {
            key_namespace: "job".to_string(),
            reject_concurrent_runs: true,
        }
    }
}

/// Builder for [`BatchRunner`].
pub struct BatchRunnerBuilder<S> {
    store: S,
    sources: SourceList,
    config: BatchRunnerConfig,
}

impl<S: StatusStore> BatchRunnerBuilder<S> {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: BatchRunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set [`BatchRunnerConfig::key_namespace`].
    #[must_use]
    pub fn key_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.key_namespace = namespace.into();
        self
    }

    /// Set [`BatchRunnerConfig::reject_concurrent_runs`].
    #[must_use]
    pub fn reject_concurrent_runs(mut self, reject: bool) -> Self {
        self.config.reject_concurrent_runs = reject;
        self
    }

    /// Register the source that serves jobs of `record_type`.
    #[must_use]
    pub fn with_source<SourceType>(mut self, record_type: impl Into<String>, source: SourceType) -> Self
    where
        SourceType: RecordSource,
    {
        self.sources.source_insert(record_type, source);
        self
    }

    /// Validate the configuration and build the runner.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConfig`] if:
    /// - `key_namespace` is empty or contains `:`
    /// - no record source was configured
    pub fn build(self) -> Result<BatchRunner<S>, BatchError> {
        let namespace = &self.config.key_namespace;
        if namespace.is_empty() {
            return Err(BatchError::InvalidConfig {
                reason: "key_namespace must not be empty".into(),
            });
        }
        if namespace.contains(':') {
            return Err(BatchError::InvalidConfig {
                reason: "key_namespace must not contain ':'".into(),
            });
        }
        if self.sources.is_empty() {
            return Err(BatchError::InvalidConfig {
                reason: "at least one record source must be configured".into(),
            });
        }

        Ok(BatchRunner {
            store: self.store,
            sources: self.sources,
            registry: JobRegistry::new(),
            config: self.config,
            in_flight: Mutex::new(HashSet::new()),
        })
    }
}

/// Resumable page-at-a-time batch runner.
///
/// The runner owns the process-local [`JobRegistry`] and talks to one
/// [`StatusStore`] and one [`RecordSource`] per record type. Every call is
/// independent: all state needed to resume lives in the store.
///
/// # Lifecycle
///
/// 1. Build with [`BatchRunner::builder`] and register job definitions
/// 2. Call [`BatchRunner::run`] with page numbers 1, 2, 3... until the report
///    says `finished`, passing the last `total_results` back through
///    [`BatchRunner::run_with_hint`] when callbacks delete records
/// 3. Call [`BatchRunner::clear_result_status`] to process everything again
pub struct BatchRunner<S> {
    store: S,
    sources: SourceList,
    registry: JobRegistry,
    config: BatchRunnerConfig,
    in_flight: Mutex<HashSet<String>>,
}

/// Marks a job as having a page in flight until dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    identifier: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.identifier);
    }
}

impl<S: StatusStore> BatchRunner<S> {
    /// Start building a runner over `store`.
    #[must_use]
    pub fn builder(store: S) -> BatchRunnerBuilder<S> {
        BatchRunnerBuilder {
            store,
            sources: SourceList::default(),
            config: BatchRunnerConfig::default(),
        }
    }

    /// Configuration the runner was built with.
    #[must_use]
    pub fn config(&self) -> &BatchRunnerConfig {
        &self.config
    }

    /// Jobs registered in this process.
    #[must_use]
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Underlying status store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a job definition for this process, returning its identifier.
    ///
    /// Re-registering an identifier replaces the definition but keeps its
    /// persisted progress.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnknownRecordType`] if no source serves the
    /// definition's record type.
    pub fn register(&mut self, definition: JobDefinition) -> Result<String, BatchError> {
        if !self.sources.contains(definition.record_type()) {
            return Err(BatchError::UnknownRecordType {
                record_type: definition.record_type().to_string(),
            });
        }
        Ok(self.registry.register(definition))
    }

    /// Process one page of a job. See [`BatchRunner::run_with_hint`].
    pub async fn run(&self, identifier: &str, page_number: u64) -> Result<ProgressReport, BatchError> {
        self.run_with_hint(identifier, page_number, None).await
    }

    /// Process one page of a job.
    ///
    /// `total_num_results` is the collection size the scheduler observed in
    /// the previous report. When the live count has dropped below it (because
    /// the callback, or someone else, deleted records), the stored offset is
    /// pulled back by the difference so records that shifted left are not
    /// skipped. Without a hint the persisted `total_results` is used.
    ///
    /// A job already `finished` is reported from its stored progress without
    /// touching the source. The report echoes the requested `page_number`;
    /// the stored progress keeps the page that finished the job.
    ///
    /// # Errors
    ///
    /// - [`BatchError::InvalidPage`] for page 0
    /// - [`BatchError::NotFound`] for an unregistered identifier
    /// - [`BatchError::AlreadyRunning`] if another page of the job is in flight
    /// - [`BatchError::Callback`] if the callback fails; earlier records of the
    ///   page stay marked and the job stays `running`
    /// - [`BatchError::Source`] / [`BatchError::Store`] on I/O failure
    pub async fn run_with_hint(
        &self,
        identifier: &str,
        page_number: u64,
        total_num_results: Option<u64>,
    ) -> Result<ProgressReport, BatchError> {
        if page_number == 0 {
            return Err(BatchError::InvalidPage);
        }
        let job = self.registry.lookup(identifier)?;
        let source = self
            .sources
            .get(job.record_type())
            .ok_or_else(|| BatchError::UnknownRecordType {
                record_type: job.record_type().to_string(),
            })?;
        let _guard = self.claim(identifier)?;
        let ledger = self.ledger(identifier);
        let base_offset = job.query_args().offset;

        let (mut progress, observed) = match ledger.load_progress().await? {
            Some(progress) if progress.status == JobStatus::Finished => {
                debug!(job = %identifier, page = page_number, "Job already finished");
                let mut report = progress.report(identifier);
                report.page_number = page_number;
                return Ok(report);
            }
            Some(progress) if progress.status == JobStatus::Running => {
                let observed = total_num_results.unwrap_or(progress.total_results);
                (progress, Some(observed))
            }
            _ => {
                info!(job = %identifier, offset = base_offset, "Starting job");
                (JobProgress::start(base_offset), total_num_results)
            }
        };

        let count_before = source
            .count(job.query_args())
            .await
            .map_err(BatchError::Source)?;

        if let Some(observed) = observed {
            if count_before < observed {
                let corrected = progress
                    .offset
                    .saturating_sub(observed - count_before)
                    .max(base_offset);
                warn!(
                    job = %identifier,
                    observed,
                    live = count_before,
                    from = progress.offset,
                    to = corrected,
                    "Collection shrank since last page, pulling offset back"
                );
                progress.offset = corrected;
            }
        }

        let page_args = job.query_args().with_offset(progress.offset);
        let records = source
            .fetch_page(&page_args)
            .await
            .map_err(BatchError::Source)?;
        let fetched = records.len() as u64;
        debug!(
            job = %identifier,
            page = page_number,
            offset = progress.offset,
            fetched,
            "Fetched page"
        );

        progress.status = JobStatus::Running;
        progress.page_number = page_number;
        progress.total_results = count_before;

        for record in records {
            if ledger.record_status(&record.id).await? == RecordStatus::Success {
                debug!(job = %identifier, record = %record.id, "Skipping processed record");
                continue;
            }

            let record_id = record.id.clone();
            if let Err(source_err) = job.apply(record).await {
                warn!(
                    job = %identifier,
                    record = %record_id,
                    error = %source_err,
                    "Callback failed, aborting page"
                );
                self.save_after_failure(job, &ledger, &mut progress).await;
                return Err(BatchError::Callback {
                    identifier: identifier.to_string(),
                    record_id,
                    source: source_err,
                });
            }

            ledger.mark_success(&record_id).await?;
            progress.total_processed += 1;
        }

        progress.offset += fetched;
        let count_after = source
            .count(job.query_args())
            .await
            .map_err(BatchError::Source)?;

        if fetched == 0 || progress.offset >= count_before.max(count_after) {
            progress.status = JobStatus::Finished;
        }
        ledger.save_progress(&progress).await?;

        if progress.status == JobStatus::Finished {
            info!(
                job = %identifier,
                page = page_number,
                processed = progress.total_processed,
                "Job finished"
            );
        } else {
            debug!(
                job = %identifier,
                page = page_number,
                offset = progress.offset,
                total = count_before,
                "Page complete"
            );
        }

        Ok(progress.report(identifier))
    }

    /// Wipe every record marker of a job and mark it `reset`.
    ///
    /// The next `run()` starts from the job's base offset and passes every
    /// record to the callback again. The definition stays registered.
    ///
    /// Markers are removed by key prefix, so markers of records that have
    /// since left the collection are removed as well.
    pub async fn clear_result_status(&self, identifier: &str) -> Result<ProgressReport, BatchError> {
        let job = self.registry.lookup(identifier)?;
        let _guard = self.claim(identifier)?;
        let ledger = self.ledger(identifier);
        let base_offset = job.query_args().offset;

        let removed = ledger.clear_markers().await?;
        let mut progress = ledger
            .load_progress()
            .await?
            .unwrap_or_else(|| JobProgress::start(base_offset));
        progress.status = JobStatus::Reset;
        progress.offset = base_offset;
        progress.total_processed = 0;
        ledger.save_progress(&progress).await?;

        info!(job = %identifier, removed, "Reset job");
        Ok(progress.report(identifier))
    }

    /// Persisted progress of a job, `None` if it never ran.
    ///
    /// Reads the store directly, so the job need not be registered.
    pub async fn get_progress(&self, identifier: &str) -> Result<Option<ProgressReport>, BatchError> {
        let progress = self.ledger(identifier).load_progress().await?;
        Ok(progress.map(|progress| progress.report(identifier)))
    }

    /// Progress of every registered job, keyed by identifier.
    pub async fn all_progress(&self) -> Result<BTreeMap<String, Option<ProgressReport>>, BatchError> {
        let mut all = BTreeMap::new();
        for identifier in self.registry.identifiers() {
            all.insert(identifier.to_string(), self.get_progress(identifier).await?);
        }
        Ok(all)
    }

    /// Remove progress and markers of every registered job.
    ///
    /// Returns the number of store keys removed.
    pub async fn clear_all(&self) -> Result<u64, BatchError> {
        let mut removed = 0;
        for identifier in self.registry.identifiers() {
            let _guard = self.claim(identifier)?;
            removed += self.ledger(identifier).wipe().await?;
        }
        info!(jobs = self.registry.len(), removed, "Cleared all jobs");
        Ok(removed)
    }

    fn ledger<'a>(&'a self, identifier: &'a str) -> Ledger<'a, S> {
        Ledger::new(&self.store, &self.config.key_namespace, identifier)
    }

    fn claim(&self, identifier: &str) -> Result<Option<InFlightGuard<'_>>, BatchError> {
        if !self.config.reject_concurrent_runs {
            return Ok(None);
        }
        if !self.in_flight.lock().insert(identifier.to_string()) {
            return Err(BatchError::AlreadyRunning {
                identifier: identifier.to_string(),
            });
        }
        Ok(Some(InFlightGuard {
            in_flight: &self.in_flight,
            identifier: identifier.to_string(),
        }))
    }

    /// Persist what the aborted page achieved. Failures here are logged; the
    /// callback error is what the caller sees.
    async fn save_after_failure(&self, job: &JobDefinition, ledger: &Ledger<'_, S>, progress: &mut JobProgress) {
        let Some(source) = self.sources.get(job.record_type()) else {
            return;
        };
        match source.count(job.query_args()).await {
            Ok(live) => progress.total_results = live,
            Err(e) => warn!(job = %job.identifier(), error = %e, "Failed to recount after callback failure"),
        }
        if let Err(e) = ledger.save_progress(progress).await {
            warn!(job = %job.identifier(), error = %e, "Failed to save progress after callback failure");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
