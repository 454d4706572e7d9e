//! Job definitions and the per-record callback contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::registry::slugify;
use crate::{BatchError, QueryArgs, Record, StorageError};

/// Trait for the side effect a job applies to every record.
///
/// A callback may mutate the collection it is walking (for example by
/// deleting the record it was handed); the runner compensates for the
/// resulting shift in offsets.
///
/// Returning an error aborts the current page. Records already marked stay
/// marked, so the next `run()` resumes with the failed record.
///
/// # Example
///
/// ```rust,ignore
/// use fast_batch_runner::{Record, RecordCallback, StorageError};
///
/// struct Touch;
///
/// impl RecordCallback for Touch {
///     async fn apply(&self, record: Record) -> Result<(), StorageError> {
///         println!("touching {}", record.id);
///         Ok(())
///     }
/// }
/// ```
pub trait RecordCallback: Send + Sync + 'static {
    /// Apply the job's side effect to one record.
    fn apply(&self, record: Record) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Adapter turning an async closure into a [`RecordCallback`].
///
/// Usually built through [`JobDefinitionBuilder::callback_fn`].
pub struct FnCallback<F>(pub F);

impl<F, Fut> RecordCallback for FnCallback<F>
where
    F: Fn(Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StorageError>> + Send,
{
    fn apply(&self, record: Record) -> impl Future<Output = Result<(), StorageError>> + Send {
        (self.0)(record)
    }
}

/// Type-erased callback held by a [`JobDefinition`].
#[async_trait::async_trait]
pub(crate) trait ErasedCallback: Send + Sync + 'static {
    async fn apply(&self, record: Record) -> Result<(), StorageError>;
}

struct CallbackAdapter<CallbackType> {
    callback: CallbackType,
}

#[async_trait::async_trait]
impl<CallbackType> ErasedCallback for CallbackAdapter<CallbackType>
where
    CallbackType: RecordCallback,
{
    async fn apply(&self, record: Record) -> Result<(), StorageError> {
        self.callback.apply(record).await
    }
}

/// A registered unit of work: a record query paired with a per-record callback.
///
/// Immutable once built. Cloning is cheap and shares the callback.
#[derive(Clone)]
pub struct JobDefinition {
    identifier: String,
    name: String,
    record_type: String,
    query_args: QueryArgs,
    callback: Arc<dyn ErasedCallback>,
}

impl JobDefinition {
    /// Start building a definition.
    #[must_use]
    pub fn builder() -> JobDefinitionBuilder {
        JobDefinitionBuilder::default()
    }

    /// Slug derived from the name; key prefix in the status store.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Human-readable label the definition was built with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selects which record source the job pages through.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Base query: filters, page size and starting offset.
    #[must_use]
    pub fn query_args(&self) -> &QueryArgs {
        &self.query_args
    }

    pub(crate) async fn apply(&self, record: Record) -> Result<(), StorageError> {
        self.callback.apply(record).await
    }
}

impl fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("query_args", &self.query_args)
            .finish_non_exhaustive()
    }
}

/// Builder for [`JobDefinition`].
///
/// `name`, `record_type` and a callback are required; `build` fails with
/// [`BatchError::InvalidDefinition`] if any is missing.
///
/// # Example
///
/// ```rust
/// use fast_batch_runner::{JobDefinition, QueryArgs};
///
/// let job = JobDefinition::builder()
///     .name("Hey there")
///     .record_type("term")
///     .callback_fn(|_record| async { Ok(()) })
///     .query_args(QueryArgs::new().number(10).filter("taxonomy", "category"))
///     .build()
///     .unwrap();
///
/// assert_eq!(job.identifier(), "hey-there");
/// ```
#[derive(Default)]
pub struct JobDefinitionBuilder {
    name: Option<String>,
    record_type: Option<String>,
    query_args: QueryArgs,
    callback: Option<Arc<dyn ErasedCallback>>,
}

impl JobDefinitionBuilder {
    /// Human-readable label; the identifier is derived from it.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record type whose source the job pages through. Required.
    #[must_use]
    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Filters, page size and base offset. Defaults to an unfiltered query
    /// with no page limit.
    #[must_use]
    pub fn query_args(mut self, query_args: QueryArgs) -> Self {
        self.query_args = query_args;
        self
    }

    /// Side effect applied to every record. Required, unless set through
    /// [`JobDefinitionBuilder::callback_fn`].
    #[must_use]
    pub fn callback<C: RecordCallback>(mut self, callback: C) -> Self {
        self.callback = Some(Arc::new(CallbackAdapter { callback }));
        self
    }

    /// Use an async closure as the callback.
    #[must_use]
    pub fn callback_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StorageError>> + Send,
    {
        self.callback(FnCallback(f))
    }

    /// Validate required fields and derive the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidDefinition`] if:
    /// - `name` is missing, blank, or has no letter or digit to derive an
    ///   identifier from
    /// - `record_type` is missing or blank
    /// - no callback was set
    pub fn build(self) -> Result<JobDefinition, BatchError> {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| invalid("name is required"))?;
        let record_type = self
            .record_type
            .filter(|record_type| !record_type.trim().is_empty())
            .ok_or_else(|| invalid("type is required"))?;
        let callback = self.callback.ok_or_else(|| invalid("callback is required"))?;

        let identifier = slugify(&name);
        if identifier.is_empty() {
            return Err(invalid("name must contain at least one letter or digit"));
        }

        Ok(JobDefinition {
            identifier,
            name,
            record_type,
            query_args: self.query_args,
            callback,
        })
    }
}

fn invalid(reason: &str) -> BatchError {
    BatchError::InvalidDefinition {
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
