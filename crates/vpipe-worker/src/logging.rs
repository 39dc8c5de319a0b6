//! Job lifecycle logging.
//!
//! Every event a monitor emits goes through [`JobLogger`], so each line carries
//! the job id and input method, and the pipeline's own output stays at
//! `debug` under the `job` span.

use tracing::{debug, error, info, warn, Span};
use vpipe_models::{InputMethod, JobId};

/// Structured logger for one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    input_method: InputMethod,
}

impl JobLogger {
    pub fn new(job_id: &JobId, input_method: InputMethod) -> Self {
        Self {
            job_id: job_id.clone(),
            input_method,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Span the monitor task runs under.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            input_method = %self.input_method
        )
    }

    pub fn submitted(&self, source: &str) {
        info!(
            job_id = %self.job_id,
            input_method = %self.input_method,
            source,
            "Job submitted"
        );
    }

    pub fn pipeline_started(&self, pid: Option<u32>) {
        info!(job_id = %self.job_id, pid, "Pipeline started");
    }

    /// One line of combined pipeline output.
    pub fn output_line(&self, line: &str) {
        debug!(job_id = %self.job_id, "pipeline: {}", line);
    }

    /// How the pipeline process ended; `None` means killed by a signal.
    pub fn pipeline_exited(&self, code: Option<i32>) {
        match code {
            Some(0) => info!(job_id = %self.job_id, exit_code = 0, "Pipeline exited"),
            Some(code) => warn!(job_id = %self.job_id, exit_code = code, "Pipeline exited"),
            None => warn!(job_id = %self.job_id, "Pipeline terminated by signal"),
        }
    }

    /// The process was killed because the job was cancelled.
    pub fn killed_on_cancel(&self, pid: Option<u32>) {
        info!(job_id = %self.job_id, pid, "Pipeline killed after cancellation");
    }

    /// Cancellation observed before a process existed.
    pub fn cancelled_before_start(&self) {
        info!(job_id = %self.job_id, "Job cancelled before the pipeline started");
    }

    pub fn kill_failed(&self, err: &dyn std::fmt::Display) {
        warn!(job_id = %self.job_id, "Failed to kill pipeline: {}", err);
    }

    pub fn completed(&self, artifacts: usize) {
        info!(
            job_id = %self.job_id,
            input_method = %self.input_method,
            artifacts,
            "Job completed"
        );
        if artifacts == 0 {
            warn!(job_id = %self.job_id, "Pipeline succeeded without artifacts");
        }
    }

    pub fn failed(&self, reason: &str) {
        error!(
            job_id = %self.job_id,
            input_method = %self.input_method,
            "Job failed: {}", reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_carries_job_fields() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            let id = JobId::from("job_42");
            let logger = JobLogger::new(&id, InputMethod::Youtube);
            assert_eq!(logger.job_id(), &id);

            let span = logger.span();
            let metadata = span.metadata().unwrap();
            assert_eq!(metadata.name(), "job");
            assert!(metadata.fields().field("job_id").is_some());
            assert!(metadata.fields().field("input_method").is_some());

            let _guard = span.enter();
            logger.submitted("https://example.com/v");
            logger.output_line("Progress: 10%");
            logger.pipeline_exited(Some(2));
            logger.pipeline_exited(None);
            logger.completed(0);
        });
    }
}
