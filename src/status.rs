//! Job-level progress, per-record markers, and the report handed back to schedulers.

use serde::{Deserialize, Serialize};

/// Persisted state of a job. An absent progress record is modelled as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Pages remain to be processed.
    Running,
    /// No unprocessed records remain.
    Finished,
    /// Markers were cleared; the next run starts over.
    Reset,
}

impl JobStatus {
    /// Lowercase name, as persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Reset => "reset",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion marker of one record within one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordStatus {
    /// The callback has not yet succeeded for this record.
    #[default]
    Unprocessed,
    /// The callback completed; the record must not be passed to it again.
    Success,
}

impl RecordStatus {
    pub(crate) const SUCCESS: &'static str = "success";

    /// Decode a stored marker. Anything other than `"success"` is unprocessed.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some(Self::SUCCESS) => Self::Success,
            _ => Self::Unprocessed,
        }
    }

    /// Value written to the store, `None` for unprocessed (no marker).
    #[must_use]
    pub fn as_stored(&self) -> Option<&'static str> {
        match self {
            Self::Unprocessed => None,
            Self::Success => Some(Self::SUCCESS),
        }
    }
}

/// Persisted progress of a job, one per job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    /// Window start for the next page.
    pub offset: u64,
    /// Distinct records marked successful.
    pub total_processed: u64,
    /// Collection size observed at the start of the last page.
    pub total_results: u64,
    /// Page number of the last run that touched this record.
    #[serde(default)]
    pub page_number: u64,
}

impl JobProgress {
    /// Fresh progress for a job whose window begins at `base_offset`.
    #[must_use]
    pub fn start(base_offset: u64) -> Self {
        Self {
            status: JobStatus::Running,
            offset: base_offset,
            total_processed: 0,
            total_results: 0,
            page_number: 0,
        }
    }

    /// Build the scheduler-facing report for this progress.
    #[must_use]
    pub fn report(&self, identifier: &str) -> ProgressReport {
        ProgressReport {
            identifier: identifier.to_string(),
            status: self.status,
            offset: self.offset,
            total_processed: self.total_processed,
            total_results: self.total_results,
            page_number: self.page_number,
        }
    }
}

/// Machine-readable result of a `run()` call.
///
/// Schedulers use `status` to decide whether to request another page and feed
/// `total_results` back as the `total_num_results` hint on the next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub identifier: String,
    pub status: JobStatus,
    pub offset: u64,
    pub total_processed: u64,
    pub total_results: u64,
    pub page_number: u64,
}

impl ProgressReport {
    /// Whether the scheduler should stop requesting pages.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    /// Completion percentage for display, clamped to `0..=100`.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.is_finished() {
            return 100;
        }
        if self.total_results == 0 {
            return 0;
        }
        let pct = self.total_processed.saturating_mul(100) / self.total_results;
        pct.min(100) as u8
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Finished).unwrap();
        assert_eq!(json, "\"finished\"");
        let status: JobStatus = serde_json::from_str("\"reset\"").unwrap();
        assert_eq!(status, JobStatus::Reset);
    }

    #[test]
    fn record_status_only_success_counts() {
        assert_eq!(RecordStatus::from_stored(Some("success")), RecordStatus::Success);
        assert_eq!(RecordStatus::from_stored(Some("")), RecordStatus::Unprocessed);
        assert_eq!(RecordStatus::from_stored(Some("failed")), RecordStatus::Unprocessed);
        assert_eq!(RecordStatus::from_stored(None), RecordStatus::Unprocessed);
        assert_eq!(RecordStatus::Success.as_stored(), Some("success"));
        assert_eq!(RecordStatus::Unprocessed.as_stored(), None);
    }

    #[test]
    fn progress_without_page_number_decodes() {
        let progress: JobProgress = serde_json::from_str(
            r#"{"status":"running","offset":3,"total_processed":3,"total_results":5}"#,
        )
        .unwrap();
        assert_eq!(progress.page_number, 0);
        assert_eq!(progress.offset, 3);
    }

    #[test]
    fn percent_tracks_processed_share() {
        let mut report = JobProgress::start(0).report("demo");
        assert_eq!(report.percent(), 0);

        report.total_results = 4;
        report.total_processed = 1;
        assert_eq!(report.percent(), 25);

        report.status = JobStatus::Finished;
        assert_eq!(report.percent(), 100);
    }
}
