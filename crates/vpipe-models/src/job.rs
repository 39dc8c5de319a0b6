//! Job records.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobParameters, JobStatus, OutputFile};

/// Progress reported as soon as the monitor starts.
pub const STARTED_PROGRESS: u8 = 5;

/// Highest progress an estimate may report before the job finishes.
pub const MAX_ESTIMATED_PROGRESS: u8 = 95;

/// Highest progress the liveness increment may reach.
pub const MAX_LIVENESS_PROGRESS: u8 = 90;

/// Millisecond timestamp of the most recently issued job ID.
static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new job ID of the form `job_<epoch millis>`.
    ///
    /// IDs are strictly increasing within a process: when the clock has not
    /// advanced past the last issued ID, the next free millisecond is used.
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let previous = LAST_ID_MILLIS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        Self(format!("job_{}", now.max(previous + 1)))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One requested pipeline run and its tracked lifecycle.
///
/// All mutators refuse to touch a record in a terminal state and return
/// `false` when they did nothing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    pub status: JobStatus,

    /// Progress (0-100)
    pub progress: u8,

    /// Request parameters
    #[serde(flatten)]
    pub params: JobParameters,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Combined stdout/stderr of the pipeline
    #[serde(default)]
    pub output: String,

    /// Error message (if failed)
    pub error: Option<String>,

    /// Produced artifacts, most recent first
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
}

impl JobRecord {
    /// Create a pending record with a fresh ID.
    pub fn new(params: JobParameters) -> Self {
        Self::with_id(JobId::generate(), params)
    }

    /// Create a pending record with a given ID.
    pub fn with_id(id: JobId, params: JobParameters) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            params,
            created_at: now,
            updated_at: now,
            output: String::new(),
            error: None,
            output_files: Vec::new(),
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    /// Move a pending job to running.
    pub fn start(&mut self) -> bool {
        if !self.transition(JobStatus::Running) {
            return false;
        }
        self.progress = self.progress.max(STARTED_PROGRESS);
        true
    }

    /// Apply a parsed progress estimate, capped below the finalize range.
    ///
    /// Progress never moves backwards. Returns whether the value changed.
    pub fn apply_estimate(&mut self, estimate: u8) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        let next = estimate.min(MAX_ESTIMATED_PROGRESS);
        if next <= self.progress {
            return false;
        }
        self.progress = next;
        self.updated_at = Utc::now();
        true
    }

    /// Nudge progress by one point so a quiet pipeline still looks alive.
    pub fn bump_liveness(&mut self) -> bool {
        if self.status != JobStatus::Running || self.progress >= MAX_LIVENESS_PROGRESS {
            return false;
        }
        self.progress += 1;
        self.updated_at = Utc::now();
        true
    }

    /// Append one line of pipeline output.
    pub fn append_output(&mut self, line: &str) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.output.push_str(line);
        self.output.push('\n');
        self.updated_at = Utc::now();
        true
    }

    /// Mark job as completed with its artifacts.
    pub fn complete(&mut self, output_files: Vec<OutputFile>) -> bool {
        if !self.transition(JobStatus::Completed) {
            return false;
        }
        self.progress = 100;
        self.output_files = output_files;
        true
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !self.transition(JobStatus::Failed) {
            return false;
        }
        self.error = Some(error.into());
        true
    }

    /// Mark job as cancelled.
    pub fn cancel(&mut self) -> bool {
        self.transition(JobStatus::Cancelled)
    }

    /// Fill the artifact list of a completed job whose list is still empty.
    pub fn cache_output_files(&mut self, output_files: Vec<OutputFile>) -> bool {
        if self.status != JobStatus::Completed
            || !self.output_files.is_empty()
            || output_files.is_empty()
        {
            return false;
        }
        self.output_files = output_files;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record() -> JobRecord {
        JobRecord::new(JobParameters::manual("input_videos/a.mp4"))
    }

    #[test]
    fn test_job_id_format_and_uniqueness() {
        let ids: HashSet<JobId> = (0..500).map(|_| JobId::generate()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.as_str().starts_with("job_")));
    }

    #[test]
    fn test_job_ids_are_increasing() {
        let a = JobId::generate();
        let b = JobId::generate();
        let millis = |id: &JobId| id.as_str()["job_".len()..].parse::<i64>().unwrap();
        assert!(millis(&b) > millis(&a));
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let mut job = record();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);

        assert!(job.start());
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, STARTED_PROGRESS);

        assert!(job.apply_estimate(40));
        assert_eq!(job.progress, 40);

        assert!(job.complete(Vec::new()));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_estimates_are_capped_and_monotonic() {
        let mut job = record();
        job.start();

        assert!(job.apply_estimate(100));
        assert_eq!(job.progress, MAX_ESTIMATED_PROGRESS);

        assert!(!job.apply_estimate(30));
        assert_eq!(job.progress, MAX_ESTIMATED_PROGRESS);
    }

    #[test]
    fn test_liveness_stops_at_ninety() {
        let mut job = record();
        job.start();
        job.apply_estimate(89);

        assert!(job.bump_liveness());
        assert_eq!(job.progress, 90);
        assert!(!job.bump_liveness());
        assert_eq!(job.progress, 90);
    }

    #[test]
    fn test_terminal_records_are_frozen() {
        let mut job = record();
        job.start();
        assert!(job.fail("Pipeline failed with exit code 2"));

        assert!(!job.cancel());
        assert!(!job.complete(Vec::new()));
        assert!(!job.apply_estimate(50));
        assert!(!job.bump_liveness());
        assert!(!job.append_output("late line"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Pipeline failed with exit code 2"));
        assert!(job.output.is_empty());
    }

    #[test]
    fn test_cancel_only_before_terminal() {
        let mut pending = record();
        assert!(pending.cancel());
        assert_eq!(pending.status, JobStatus::Cancelled);
        assert!(!pending.start());

        let mut done = record();
        done.start();
        done.complete(Vec::new());
        assert!(!done.cancel());
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[test]
    fn test_pending_job_ignores_progress() {
        let mut job = record();
        assert!(!job.apply_estimate(50));
        assert!(!job.bump_liveness());
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn test_record_serializes_flat_parameters() {
        let job = record();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["input_method"], "manual");
        assert_eq!(value["source"], "input_videos/a.mp4");
        assert!(value["error"].is_null());
        assert_eq!(value["output_files"].as_array().unwrap().len(), 0);
    }
}
