//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;
use vpipe_models::{JobId, JobStatus, ValidationError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already exists: {0}")]
    DuplicateJob(JobId),

    #[error("Job {id} cannot be cancelled in status {status}")]
    InvalidTransition { id: JobId, status: JobStatus },

    #[error("{0}")]
    CommandBuild(String),

    #[error("Video path not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Pipeline failed with exit code {0}")]
    PipelineExit(i32),

    #[error("Pipeline terminated by signal")]
    PipelineSignalled,

    #[error("Media error: {0}")]
    Media(#[from] vpipe_media::MediaError),
}

impl WorkerError {
    pub fn command_build(msg: impl Into<String>) -> Self {
        Self::CommandBuild(msg.into())
    }
}
