//! Input directory listing.

use std::path::Path;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use vpipe_media::is_video_file;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One file in the input directory.
#[derive(Serialize)]
pub struct InputFile {
    pub name: String,
    /// Path relative to the workspace, usable as a manual job path
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_video: bool,
}

/// Input listing response.
#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<InputFile>,
    pub count: usize,
}

/// List regular files in the input directory.
pub async fn list_input_files(State(state): State<AppState>) -> ApiResult<Json<FilesResponse>> {
    let pipeline = state.pipeline();
    let files = read_input_dir(&pipeline.input_dir, &pipeline.workspace_dir).await?;

    Ok(Json(FilesResponse {
        count: files.len(),
        files,
    }))
}

async fn read_input_dir(input_dir: &Path, workspace: &Path) -> ApiResult<Vec<InputFile>> {
    let mut entries = match tokio::fs::read_dir(input_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Input directory {} does not exist", input_dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to list files: {}", e))),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list files: {}", e)))?
    {
        let path = entry.path();
        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        files.push(InputFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path
                .strip_prefix(workspace)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned(),
            size: metadata.len(),
            modified: metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default(),
            is_video: is_video_file(&path),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
