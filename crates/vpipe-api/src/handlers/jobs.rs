//! Job handlers.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;
use vpipe_models::{CreateJobRequest, JobId, JobRecord, JobStatus, OutputFile};

use crate::error::{ApiError, ApiResult};
use crate::security::{ensure_within_workspace, is_valid_filename};
use crate::state::AppState;

/// Job list response.
#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub count: usize,
}

/// Job outputs response.
#[derive(Serialize)]
pub struct JobOutputsResponse {
    pub job_id: JobId,
    pub output_files: Vec<OutputFile>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create a job and start its pipeline.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let params = request
        .into_parameters()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let record = state.orchestrator.submit(params).await?;
    info!(job_id = %record.id, "Job created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// List all jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state.orchestrator.list().await;
    Json(JobListResponse {
        count: jobs.len(),
        jobs,
    })
}

/// Get one job, including its captured output.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let record = state.orchestrator.get(&JobId::from(job_id)).await?;
    Ok(Json(record))
}

/// Cancel a pending or running job.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let record = state.orchestrator.cancel(&JobId::from(job_id)).await?;
    Ok(Json(record))
}

/// List the artifacts of a job.
pub async fn list_job_outputs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobOutputsResponse>> {
    let record = state.orchestrator.artifacts(&JobId::from(job_id)).await?;

    if record.status != JobStatus::Completed {
        return Ok(Json(JobOutputsResponse {
            job_id: record.id,
            output_files: Vec::new(),
            count: 0,
            message: Some("Job not completed yet".to_string()),
        }));
    }

    Ok(Json(JobOutputsResponse {
        job_id: record.id,
        count: record.output_files.len(),
        output_files: record.output_files,
        message: None,
    }))
}

/// Download the first artifact of a job.
pub async fn download_output(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    serve_artifact(&state, JobId::from(job_id), "").await
}

/// Download an artifact of a job by (partial) name.
pub async fn download_named_output(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    serve_artifact(&state, JobId::from(job_id), &filename).await
}

/// Pick the artifact a download request refers to.
///
/// An empty name or `download` selects the first artifact. Otherwise an exact
/// name match wins, then a name containing or ending with the request, and
/// finally the first artifact.
pub fn select_artifact<'a>(files: &'a [OutputFile], requested: &str) -> Option<&'a OutputFile> {
    if requested.is_empty() || requested == "download" {
        return files.first();
    }

    files
        .iter()
        .find(|f| f.name == requested)
        .or_else(|| {
            files
                .iter()
                .find(|f| f.name.contains(requested) || f.name.ends_with(requested))
        })
        .or_else(|| files.first())
}

/// Content type of an artifact by extension.
pub fn content_type_for(file: &OutputFile) -> &'static str {
    match file.extension().as_deref() {
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "video/mp4",
    }
}

async fn serve_artifact(state: &AppState, job_id: JobId, requested: &str) -> ApiResult<Response> {
    if !requested.is_empty() && !is_valid_filename(requested) {
        return Err(ApiError::bad_request("Invalid file name"));
    }

    let record = state.orchestrator.get(&job_id).await?;
    if record.status != JobStatus::Completed {
        return Err(ApiError::bad_request("Job not completed"));
    }

    let record = state.orchestrator.artifacts(&job_id).await?;
    let artifact = select_artifact(&record.output_files, requested)
        .ok_or_else(|| ApiError::not_found("No output files found for this job"))?;

    let path = ensure_within_workspace(&artifact.path, &state.pipeline().workspace_dir).await?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Output file not found"))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read {}: {}", path.display(), e)))?
        .len();

    info!(
        job_id = %job_id,
        file = %artifact.name,
        size,
        "Serving artifact"
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.name.replace(['"', '\\'], "_")
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(artifact))
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
