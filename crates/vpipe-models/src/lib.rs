//! Shared data models for the VPipe job service.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and their lifecycle status
//! - Job creation requests and canonical processing parameters
//! - Output artifact descriptors

pub mod artifact;
pub mod job;
pub mod job_status;
pub mod request;

// Re-export common types
pub use artifact::OutputFile;
pub use job::{JobId, JobRecord};
pub use job_status::JobStatus;
pub use request::{
    CreateJobRequest, InputMethod, JobParameters, ProcessingFlags, ValidationError,
    DEFAULT_UPSCALE_FACTOR,
};
