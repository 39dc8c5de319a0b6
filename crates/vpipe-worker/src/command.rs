//! Pipeline command construction.

use std::path::{Path, PathBuf};

use vpipe_media::PipelineCommand;
use vpipe_models::{InputMethod, JobParameters};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};

/// Resolve a manual input path against the workspace root.
pub fn resolve_manual_path(path: &str, workspace_dir: &Path) -> PathBuf {
    let path = Path::new(path.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_dir.join(path)
    }
}

/// Build the pipeline invocation for one job.
///
/// Arguments, in order: wrapper script, source locator, then the UNet,
/// face-restore and upscale toggles, the upscale factor and the CLAHE toggle.
pub fn build_pipeline_command(
    params: &JobParameters,
    config: &PipelineConfig,
) -> WorkerResult<PipelineCommand> {
    let locator = match params.input_method {
        InputMethod::Youtube => {
            let url = params.source.trim();
            if url.is_empty() {
                return Err(WorkerError::command_build(
                    "YouTube URL is required for youtube input method",
                ));
            }
            url.to_string()
        }
        InputMethod::Manual => {
            if params.source.trim().is_empty() {
                return Err(WorkerError::command_build(
                    "Manual path is required for manual input method",
                ));
            }
            let path = resolve_manual_path(&params.source, &config.workspace_dir);
            if !path.is_file() {
                return Err(WorkerError::SourceNotFound(path));
            }
            path.to_string_lossy().into_owned()
        }
    };

    let flags = &params.flags;
    Ok(PipelineCommand::new(&config.interpreter)
        .arg(config.wrapper_path().to_string_lossy())
        .arg(locator)
        .flag(flags.unet)
        .flag(flags.face_restore)
        .flag(flags.upscale)
        .decimal(flags.upscale_factor)
        .flag(flags.clahe)
        .working_dir(&config.workspace_dir))
}
