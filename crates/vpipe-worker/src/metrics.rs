//! Job lifecycle metrics.
//!
//! Counters are no-ops until the binary installs a recorder.

use metrics::counter;
use vpipe_models::InputMethod;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vpipe_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vpipe_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vpipe_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "vpipe_jobs_cancelled_total";
}

/// Record job submitted.
pub fn record_job_submitted(method: InputMethod) {
    let labels = [("input_method", method.as_str().to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record job completed.
pub fn record_job_completed(method: InputMethod) {
    let labels = [("input_method", method.as_str().to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record job failed.
pub fn record_job_failed(method: InputMethod) {
    let labels = [("input_method", method.as_str().to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record job cancelled.
pub fn record_job_cancelled(method: InputMethod) {
    let labels = [("input_method", method.as_str().to_string())];
    counter!(names::JOBS_CANCELLED_TOTAL, &labels).increment(1);
}
