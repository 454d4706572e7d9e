//! A resumable, page-at-a-time batch runner.
//!
//! This crate applies a caller-supplied callback to every record of a large
//! collection, one page per call, so the work can be spread over many short
//! invocations (web requests, cron ticks, CLI runs) and survive interruptions.
//! Progress and per-record completion markers live in a status store, never
//! in process memory.
//!
//! Built-in implementations are provided:
//!
//! - [`MemoryStore`] / [`FileStore`] - Status stores (in-memory, JSON file)
//! - [`MemorySource`] - In-memory record source
//! - Custom backends - Implement [`StatusStore`] or [`RecordSource`]
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐     ┌───────────────────────┐
//!  run(id, page) ─►│ BatchRunner  │────►│ RecordSource["term"]  │
//!                  │  JobRegistry │     │ RecordSource["post"]  │
//!                  └──────┬───────┘     └───────────────────────┘
//!                         │ progress + markers
//!                         ▼
//!                  ┌──────────────┐
//!                  │ StatusStore  │
//!                  └──────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fast_batch_runner::{BatchRunner, JobDefinition, MemorySource, MemoryStore, QueryArgs};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fast_batch_runner::BatchError> {
//!     let terms = MemorySource::new();
//!
//!     let mut runner = BatchRunner::builder(MemoryStore::new())
//!         .with_source("term", terms.clone())
//!         .build()?;
//!
//!     let id = runner.register(
//!         JobDefinition::builder()
//!             .name("Re-index terms")
//!             .record_type("term")
//!             .query_args(QueryArgs::new().number(50))
//!             .callback_fn(|record| async move {
//!                 println!("Processing {}", record.id);
//!                 Ok(())
//!             })
//!             .build()?,
//!     )?;
//!
//!     let mut page = 1;
//!     let mut hint = None;
//!     loop {
//!         let report = runner.run_with_hint(&id, page, hint).await?;
//!         if report.is_finished() {
//!             break;
//!         }
//!         hint = Some(report.total_results);
//!         page += 1;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! Each `run()` handles one page, sequentially. Two pages of the same job must
//! not be processed at once: progress is read and written without a
//! transaction. The runner rejects overlapping calls within one process (see
//! [`BatchRunnerConfig::reject_concurrent_runs`]); across processes this is
//! the scheduler's responsibility.
//!
//! Offset correction for shrinking collections compares the live count with
//! the last observed one. It cannot tell apart deletions made by the job's
//! own callback and concurrent changes made by others, so external writers
//! racing a running job may still cause records to be skipped or revisited;
//! revisited records are skipped through their markers.

mod error;
mod job;
mod record;
mod registry;
mod runner;
mod source;
mod status;
mod storage;

pub use error::BatchError;
pub use job::{FnCallback, JobDefinition, JobDefinitionBuilder, RecordCallback};
pub use record::{QueryArgs, Record};
pub use registry::JobRegistry;
pub use runner::{BatchRunner, BatchRunnerBuilder, BatchRunnerConfig};
pub use source::{MemorySource, RecordSource};
pub use status::{JobProgress, JobStatus, ProgressReport, RecordStatus};
pub use storage::{FileStore, MemoryStore, StatusStore, StorageError};
