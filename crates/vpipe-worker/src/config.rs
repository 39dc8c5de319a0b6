//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vpipe_media::DEFAULT_ARTIFACT_PREFIX;

/// Default workspace root of the pipeline installation.
pub const DEFAULT_WORKSPACE_DIR: &str = "/workspace";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Workspace root; the pipeline runs here and downloads are confined to it
    pub workspace_dir: PathBuf,
    /// Directory holding source videos
    pub input_dir: PathBuf,
    /// Directory the pipeline writes results into
    pub output_dir: PathBuf,
    /// Interpreter used to launch the wrapper script
    pub interpreter: String,
    /// Wrapper script, relative to the workspace or absolute
    pub wrapper: String,
    /// Directory prefix of final-artifact directories
    pub artifact_prefix: String,
    /// Quiet period after which progress gets a liveness increment
    pub liveness_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_workspace(DEFAULT_WORKSPACE_DIR)
    }
}

impl PipelineConfig {
    /// Config with the conventional layout under `workspace_dir`.
    ///
    /// A relative workspace is taken against the current directory, so the
    /// paths handed to the pipeline stay valid inside its working directory.
    pub fn for_workspace(workspace_dir: impl AsRef<Path>) -> Self {
        let workspace_dir = absolute(workspace_dir.as_ref());
        Self {
            input_dir: workspace_dir.join("input_videos"),
            output_dir: workspace_dir.join("output_videos_latest"),
            workspace_dir,
            interpreter: "python".to_string(),
            wrapper: "pipeline_wrapper.py".to_string(),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            liveness_interval: Duration::from_secs(10),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let workspace_dir = std::env::var("VPIPE_WORKSPACE_DIR")
            .unwrap_or_else(|_| DEFAULT_WORKSPACE_DIR.to_string());
        let defaults = Self::for_workspace(&workspace_dir);

        Self {
            input_dir: std::env::var("VPIPE_INPUT_DIR")
                .map(|dir| absolute(Path::new(&dir)))
                .unwrap_or(defaults.input_dir),
            output_dir: std::env::var("VPIPE_OUTPUT_DIR")
                .map(|dir| absolute(Path::new(&dir)))
                .unwrap_or(defaults.output_dir),
            interpreter: std::env::var("VPIPE_INTERPRETER").unwrap_or(defaults.interpreter),
            wrapper: std::env::var("VPIPE_WRAPPER").unwrap_or(defaults.wrapper),
            artifact_prefix: std::env::var("VPIPE_ARTIFACT_PREFIX")
                .unwrap_or(defaults.artifact_prefix),
            liveness_interval: Duration::from_secs(
                std::env::var("VPIPE_LIVENESS_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            workspace_dir: defaults.workspace_dir,
        }
    }

    /// Set the interpreter and wrapper script.
    pub fn with_pipeline(mut self, interpreter: impl Into<String>, wrapper: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self.wrapper = wrapper.into();
        self
    }

    /// Set the liveness interval.
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Path of the wrapper script as the pipeline will see it.
    pub fn wrapper_path(&self) -> PathBuf {
        self.workspace_dir.join(&self.wrapper)
    }

    /// Create the input directory if it is missing.
    pub async fn ensure_directories(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.input_dir).await
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
