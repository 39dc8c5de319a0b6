//! Health and status handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vpipe_media::resolve_program;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub workspace: String,
    pub input_dir: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = state.pipeline();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        workspace: pipeline.workspace_dir.display().to_string(),
        input_dir: pipeline.input_dir.display().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// A directory and whether it exists.
#[derive(Serialize)]
pub struct DirectoryStatus {
    pub path: String,
    pub exists: bool,
}

/// Pipeline installation checks.
#[derive(Serialize)]
pub struct PipelineStatus {
    pub wrapper: String,
    pub wrapper_exists: bool,
    pub interpreter: String,
    pub interpreter_available: bool,
}

/// Server status response.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub workspace: DirectoryStatus,
    pub input_dir: DirectoryStatus,
    pub output_dir: DirectoryStatus,
    pub pipeline: PipelineStatus,
    pub active_jobs: usize,
    pub total_jobs: usize,
    pub timestamp: String,
}

async fn directory_status(path: &std::path::Path) -> DirectoryStatus {
    DirectoryStatus {
        path: path.display().to_string(),
        exists: tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false),
    }
}

/// Workspace and pipeline status.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let pipeline = state.pipeline();
    let registry = state.orchestrator.registry();
    let wrapper = pipeline.wrapper_path();

    Json(StatusResponse {
        status: "online".to_string(),
        workspace: directory_status(&pipeline.workspace_dir).await,
        input_dir: directory_status(&pipeline.input_dir).await,
        output_dir: directory_status(&pipeline.output_dir).await,
        pipeline: PipelineStatus {
            wrapper_exists: tokio::fs::try_exists(&wrapper).await.unwrap_or(false),
            wrapper: wrapper.display().to_string(),
            interpreter_available: resolve_program(&pipeline.interpreter).is_ok(),
            interpreter: pipeline.interpreter.clone(),
        },
        active_jobs: registry.count_active().await,
        total_jobs: registry.len().await,
        timestamp: Utc::now().to_rfc3339(),
    })
}
