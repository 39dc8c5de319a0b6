//! Path and input checks for file-serving endpoints.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ApiError, ApiResult};

/// Maximum accepted length of a requested download name.
const MAX_FILENAME_LENGTH: usize = 256;

/// Validate a requested download name.
///
/// The name is only ever compared against artifact names, but traversal
/// sequences are still refused outright.
pub fn is_valid_filename(name: &str) -> bool {
    if name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }
    !name.chars().any(|c| c.is_control())
}

/// Canonicalize `path` and require it to lie inside `workspace`.
///
/// Returns the canonical path. A missing file is `NotFound`; a path that
/// resolves outside the workspace (including through symlinks) is
/// `Forbidden`.
pub async fn ensure_within_workspace(path: &Path, workspace: &Path) -> ApiResult<PathBuf> {
    let root = tokio::fs::canonicalize(workspace).await.map_err(|e| {
        ApiError::internal(format!(
            "Workspace {} is not accessible: {}",
            workspace.display(),
            e
        ))
    })?;

    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|_| ApiError::not_found("File not found on disk"))?;

    if !resolved.starts_with(&root) {
        warn!(
            path = %resolved.display(),
            workspace = %root.display(),
            "Blocked download outside workspace"
        );
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(resolved)
}
