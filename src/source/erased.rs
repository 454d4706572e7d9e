//! Runtime list of typed record sources, keyed by record type.

use std::collections::HashMap;
use std::sync::Arc;

use super::RecordSource;
use crate::{QueryArgs, Record, StorageError};

/// Type-erased source entry used by the runner.
#[async_trait::async_trait]
pub(crate) trait SourceListItem: Send + Sync + 'static {
    async fn count(&self, args: &QueryArgs) -> Result<u64, StorageError>;

    async fn fetch_page(&self, args: &QueryArgs) -> Result<Vec<Record>, StorageError>;
}

struct SourceAdapter<SourceType> {
    source: SourceType,
}

#[async_trait::async_trait]
impl<SourceType> SourceListItem for SourceAdapter<SourceType>
where
    SourceType: RecordSource,
{
    async fn count(&self, args: &QueryArgs) -> Result<u64, StorageError> {
        self.source.count(args).await
    }

    async fn fetch_page(&self, args: &QueryArgs) -> Result<Vec<Record>, StorageError> {
        self.source.fetch_page(args).await
    }
}

/// Collection of heterogeneous typed sources, one per record type.
#[derive(Default, Clone)]
pub(crate) struct SourceList {
    items: HashMap<String, Arc<dyn SourceListItem>>,
}

impl SourceList {
    /// Add one typed source, replacing any previous source for `record_type`.
    pub(crate) fn source_insert<SourceType>(&mut self, record_type: impl Into<String>, source: SourceType)
    where
        SourceType: RecordSource,
    {
        self.items
            .insert(record_type.into(), Arc::new(SourceAdapter { source }));
    }

    pub(crate) fn get(&self, record_type: &str) -> Option<&Arc<dyn SourceListItem>> {
        self.items.get(record_type)
    }

    pub(crate) fn contains(&self, record_type: &str) -> bool {
        self.items.contains_key(record_type)
    }

    /// Returns true when there are no source entries.
    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
