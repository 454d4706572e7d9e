//! Record sources: the paged collections a job walks through.
//!
//! This module provides:
//! - [`RecordSource`] trait - Count and page contract for a collection
//! - [`MemorySource`] - In-memory collection for testing and small data sets

use std::future::Future;
use std::sync::Arc;

use crate::{QueryArgs, Record, StorageError};

mod erased;
mod memory;

pub(crate) use erased::SourceList;
pub use memory::MemorySource;

/// Trait for paged record collections.
///
/// Implementations must page deterministically: while the collection is
/// unchanged, two calls with the same arguments return the same records in
/// the same order. `args.number` of `None` or `Some(0)` means "no limit".
///
/// # Example
///
/// ```rust,no_run
/// use fast_batch_runner::{MemorySource, QueryArgs, Record, RecordSource, StorageError};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), StorageError> {
/// let source = MemorySource::new();
/// source.insert(Record::new("1", json!({ "taxonomy": "category" }))).await;
///
/// let args = QueryArgs::new().number(10).filter("taxonomy", "category");
/// assert_eq!(source.count(&args).await?, 1);
/// assert_eq!(source.fetch_page(&args).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub trait RecordSource: Send + Sync + 'static {
    /// Number of records matching the filters, ignoring `number` and `offset`.
    fn count(&self, args: &QueryArgs) -> impl Future<Output = Result<u64, StorageError>> + Send;

    /// Records matching the filters, starting at `args.offset`, at most `args.number` of them.
    fn fetch_page(
        &self,
        args: &QueryArgs,
    ) -> impl Future<Output = Result<Vec<Record>, StorageError>> + Send;
}

impl<InnerSource> RecordSource for Arc<InnerSource>
where
    InnerSource: RecordSource,
{
    fn count(&self, args: &QueryArgs) -> impl Future<Output = Result<u64, StorageError>> + Send {
        self.as_ref().count(args)
    }

    fn fetch_page(
        &self,
        args: &QueryArgs,
    ) -> impl Future<Output = Result<Vec<Record>, StorageError>> + Send {
        self.as_ref().fetch_page(args)
    }
}
