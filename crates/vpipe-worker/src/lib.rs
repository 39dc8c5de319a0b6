//! Pipeline job orchestration.
//!
//! This crate provides:
//! - The in-memory job registry (single source of truth for job state)
//! - Pipeline command construction from job parameters
//! - The orchestrator that runs and monitors one pipeline process per job
//! - Structured job logging and job metrics

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod registry;

pub use command::{build_pipeline_command, resolve_manual_path};
pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::JobOrchestrator;
pub use registry::JobRegistry;
