//! Application state.

use vpipe_worker::{JobOrchestrator, JobRegistry, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    /// Create new application state with an empty job registry.
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> Self {
        Self {
            config,
            orchestrator: JobOrchestrator::new(pipeline, JobRegistry::new()),
        }
    }

    /// Pipeline configuration.
    pub fn pipeline(&self) -> &PipelineConfig {
        self.orchestrator.config()
    }
}
