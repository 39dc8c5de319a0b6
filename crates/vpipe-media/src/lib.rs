#![deny(unreachable_patterns)]
//! External pipeline plumbing.
//!
//! This crate provides:
//! - Pipeline command building with explicit boolean/decimal argument tokens
//! - A process runner that merges stdout/stderr into one line stream
//! - Heuristic progress estimation from pipeline output lines
//! - Discovery of produced artifacts in the output directory layout

pub mod artifacts;
pub mod command;
pub mod error;
pub mod progress;
pub mod runner;

pub use artifacts::{
    is_video_file, latest_video_stem, source_name_from_path, ArtifactResolver, ArtifactSearch,
    ArtifactTier, DEFAULT_ARTIFACT_PREFIX, VIDEO_EXTENSIONS,
};
pub use command::{format_decimal, resolve_program, PipelineCommand};
pub use error::{MediaError, MediaResult};
pub use progress::estimate_progress;
pub use runner::{ProcessExit, ProcessRunner, RunningProcess};
