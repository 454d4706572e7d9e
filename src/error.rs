//! Error types for the batch runner crate.

use thiserror::Error;

use crate::StorageError;

/// Errors that can occur when registering or running batch jobs.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A job definition is missing a required field or its name yields no identifier.
    #[error("Invalid job definition: {reason}")]
    InvalidDefinition { reason: String },

    /// No job is registered under the identifier.
    #[error("Job not found: {identifier}")]
    NotFound { identifier: String },

    /// Page numbers are 1-based.
    #[error("Invalid page number: pages start at 1")]
    InvalidPage,

    /// Runner configuration was rejected by the builder.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A job references a record type with no configured source.
    #[error("No record source configured for type '{record_type}'")]
    UnknownRecordType { record_type: String },

    /// Another page of the same job is still being processed in this process.
    #[error("Job '{identifier}' already has a page in flight")]
    AlreadyRunning { identifier: String },

    /// The job callback failed; the page was aborted at this record.
    #[error("Callback failed for record '{record_id}' in job '{identifier}': {source}")]
    Callback {
        identifier: String,
        record_id: String,
        #[source]
        source: StorageError,
    },

    /// The record source failed to count or fetch.
    #[error("Record source error: {0}")]
    Source(#[source] StorageError),

    /// The status store failed to read or write.
    #[error("Status store error: {0}")]
    Store(#[source] StorageError),

    /// Persisted job progress could not be decoded.
    #[error("Corrupt progress for job '{identifier}': {source}")]
    CorruptProgress {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}
