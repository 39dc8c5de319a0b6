//! Output artifact descriptors.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A media file produced by a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputFile {
    /// File name
    pub name: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Path relative to the workspace root
    pub relative_path: String,
    /// Marker subdirectory the file was found in, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl OutputFile {
    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}
