//! Discovery of pipeline output artifacts.
//!
//! The pipeline writes its results under `<output_root>/<source_name>/`.
//! Finished renders normally land in a subdirectory whose name starts with a
//! marker prefix; older pipeline versions write them straight into the
//! source directory. Resolution tries both, in that order:
//!
//! 1. [`ArtifactTier::Marker`]: the first marker subdirectory (by name) that
//!    holds at least one video file.
//! 2. [`ArtifactTier::Fallback`]: video files directly inside the source
//!    directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};
use vpipe_models::OutputFile;

use crate::error::{MediaError, MediaResult};

/// Extensions recognized as video files.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

/// Directory prefix of the canonical final-artifact directory.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "final_without_post_process_";

/// Which search tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactTier {
    Marker,
    Fallback,
}

/// Outcome of an artifact search.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSearch {
    /// Tier that produced `files`, or `None` when nothing was found
    pub tier: Option<ArtifactTier>,
    /// Artifacts, most recently modified first
    pub files: Vec<OutputFile>,
}

/// Check whether a path has a recognized video extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Source name of a local input: its file stem.
pub fn source_name_from_path(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Stem of the most recently modified video file in `input_dir`.
///
/// Downloaded sources are not tracked by name, so the newest video in the
/// input directory is taken as the one a job just fetched.
pub async fn latest_video_stem(input_dir: &Path) -> MediaResult<Option<String>> {
    if !fs::try_exists(input_dir).await.unwrap_or(false) {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, String)> = None;
    for (path, metadata) in list_files(input_dir).await? {
        if !is_video_file(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, stem.to_string()));
        }
    }

    Ok(newest.map(|(_, stem)| stem))
}

/// Locates artifacts produced by the pipeline.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    /// Root that relative paths are computed against
    workspace_root: PathBuf,
    /// Directory holding one subdirectory per source
    output_root: PathBuf,
    /// Marker prefix of final-artifact subdirectories
    marker_prefix: String,
}

impl ArtifactResolver {
    /// Create a resolver with the default marker prefix.
    pub fn new(workspace_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            output_root: output_root.into(),
            marker_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
        }
    }

    /// Override the marker prefix.
    pub fn with_marker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.marker_prefix = prefix.into();
        self
    }

    /// Artifacts for `source_name`, most recent first.
    pub async fn resolve(&self, source_name: &str) -> MediaResult<Vec<OutputFile>> {
        Ok(self.search(source_name).await?.files)
    }

    /// Run the two-tier search for `source_name`.
    pub async fn search(&self, source_name: &str) -> MediaResult<ArtifactSearch> {
        let source_dir = self.output_root.join(source_name);
        if !fs::metadata(&source_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            debug!("Output directory does not exist: {}", source_dir.display());
            return Ok(ArtifactSearch::default());
        }

        let mut search = match self.search_marker_dirs(&source_dir).await? {
            Some(files) => ArtifactSearch {
                tier: Some(ArtifactTier::Marker),
                files,
            },
            None => {
                debug!(
                    "No marker directory with videos in {}, checking it directly",
                    source_dir.display()
                );
                let files = self.collect_videos(&source_dir, None).await?;
                ArtifactSearch {
                    tier: (!files.is_empty()).then_some(ArtifactTier::Fallback),
                    files,
                }
            }
        };

        search.files.sort_by(|a, b| b.modified.cmp(&a.modified));
        info!(
            "Found {} output file(s) for source {} ({:?})",
            search.files.len(),
            source_name,
            search.tier
        );
        Ok(search)
    }

    /// First marker subdirectory (by name) that contains video files.
    async fn search_marker_dirs(&self, source_dir: &Path) -> MediaResult<Option<Vec<OutputFile>>> {
        let mut marker_dirs = Vec::new();
        let mut entries = fs::read_dir(source_dir)
            .await
            .map_err(|e| MediaError::read_dir(source_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MediaError::read_dir(source_dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&self.marker_prefix) {
                continue;
            }
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                marker_dirs.push(name);
            }
        }
        marker_dirs.sort();

        for name in marker_dirs {
            let files = self
                .collect_videos(&source_dir.join(&name), Some(&name))
                .await?;
            if !files.is_empty() {
                debug!("Using marker directory {}", name);
                return Ok(Some(files));
            }
        }

        Ok(None)
    }

    /// Video files directly inside `dir`.
    async fn collect_videos(&self, dir: &Path, label: Option<&str>) -> MediaResult<Vec<OutputFile>> {
        Ok(list_files(dir)
            .await?
            .into_iter()
            .filter(|(path, _)| is_video_file(path))
            .map(|(path, metadata)| self.describe(path, &metadata, label))
            .collect())
    }

    fn describe(&self, path: PathBuf, metadata: &std::fs::Metadata, label: Option<&str>) -> OutputFile {
        let path = std::path::absolute(&path).unwrap_or(path);
        let relative_path = path
            .strip_prefix(&self.workspace_root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        OutputFile {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            modified: DateTime::<Utc>::from(modified),
            relative_path,
            directory: label.map(str::to_string),
            path,
        }
    }
}

/// Regular files directly inside `dir`, with their metadata.
async fn list_files(dir: &Path) -> MediaResult<Vec<(PathBuf, std::fs::Metadata)>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| MediaError::read_dir(dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MediaError::read_dir(dir, e))?
    {
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push((path, metadata)),
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Layout {
        _dir: TempDir,
        workspace: PathBuf,
        output: PathBuf,
    }

    fn layout() -> Layout {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path().to_path_buf();
        let output = workspace.join("output_videos_latest");
        std::fs::create_dir_all(&output).unwrap();
        Layout {
            _dir: dir,
            workspace,
            output,
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"video").unwrap();
    }

    fn set_mtime(path: &Path, secs_ago: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
            .unwrap();
    }

    #[tokio::test]
    async fn test_marker_directory_tier() {
        let l = layout();
        touch(&l.output.join("source/final_marker_abc/video.mp4"));
        touch(&l.output.join("source/final_marker_abc/notes.txt"));

        let resolver =
            ArtifactResolver::new(&l.workspace, &l.output).with_marker_prefix("final_marker_");
        let search = resolver.search("source").await.unwrap();

        assert_eq!(search.tier, Some(ArtifactTier::Marker));
        assert_eq!(search.files.len(), 1);
        let file = &search.files[0];
        assert_eq!(file.name, "video.mp4");
        assert_eq!(
            file.relative_path,
            "output_videos_latest/source/final_marker_abc/video.mp4"
        );
        assert_eq!(file.directory.as_deref(), Some("final_marker_abc"));
        assert!(file.path.is_absolute());
        assert_eq!(file.size, 5);
    }

    #[tokio::test]
    async fn test_fallback_tier() {
        let l = layout();
        touch(&l.output.join("source/video.mp4"));
        std::fs::create_dir_all(l.output.join("source/scratch")).unwrap();

        let resolver = ArtifactResolver::new(&l.workspace, &l.output);
        let search = resolver.search("source").await.unwrap();

        assert_eq!(search.tier, Some(ArtifactTier::Fallback));
        assert_eq!(search.files.len(), 1);
        assert_eq!(search.files[0].name, "video.mp4");
        assert_eq!(search.files[0].directory, None);
    }

    #[tokio::test]
    async fn test_empty_marker_directory_falls_back() {
        let l = layout();
        touch(&l.output.join("source/final_without_post_process_1/log.txt"));
        touch(&l.output.join("source/direct.mkv"));

        let resolver = ArtifactResolver::new(&l.workspace, &l.output);
        let search = resolver.search("source").await.unwrap();

        assert_eq!(search.tier, Some(ArtifactTier::Fallback));
        assert_eq!(search.files[0].name, "direct.mkv");
    }

    #[tokio::test]
    async fn test_first_marker_directory_with_videos_wins() {
        let l = layout();
        std::fs::create_dir_all(l.output.join("source/final_without_post_process_a")).unwrap();
        touch(&l.output.join("source/final_without_post_process_b/one.mp4"));
        touch(&l.output.join("source/final_without_post_process_c/two.mp4"));
        touch(&l.output.join("source/loose.mp4"));

        let resolver = ArtifactResolver::new(&l.workspace, &l.output);
        let files = resolver.resolve("source").await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "one.mp4");
    }

    #[tokio::test]
    async fn test_sorted_most_recent_first() {
        let l = layout();
        let old = l.output.join("source/final_without_post_process_x/old.mp4");
        let new = l.output.join("source/final_without_post_process_x/new.MOV");
        touch(&old);
        touch(&new);
        set_mtime(&old, 3600);
        set_mtime(&new, 10);

        let resolver = ArtifactResolver::new(&l.workspace, &l.output);
        let names: Vec<String> = resolver
            .resolve("source")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        assert_eq!(names, vec!["new.MOV", "old.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_source_directory() {
        let l = layout();
        let resolver = ArtifactResolver::new(&l.workspace, &l.output);
        let search = resolver.search("nothing-here").await.unwrap();
        assert!(search.files.is_empty());
        assert_eq!(search.tier, None);
    }

    #[tokio::test]
    async fn test_latest_video_stem() {
        let l = layout();
        let input = l.workspace.join("input_videos");
        let older = input.join("older.mp4");
        let newer = input.join("newer.webm");
        let ignored = input.join("newest.txt");
        touch(&older);
        touch(&newer);
        touch(&ignored);
        set_mtime(&older, 600);
        set_mtime(&newer, 60);

        assert_eq!(
            latest_video_stem(&input).await.unwrap().as_deref(),
            Some("newer")
        );
        assert_eq!(
            latest_video_stem(&l.workspace.join("missing")).await.unwrap(),
            None
        );
    }

    #[test]
    fn test_source_name_and_extensions() {
        assert_eq!(
            source_name_from_path("/workspace/input_videos/My Clip.final.mp4").as_deref(),
            Some("My Clip.final")
        );
        assert_eq!(source_name_from_path(""), None);
        assert!(is_video_file(Path::new("a.WEBM")));
        assert!(!is_video_file(Path::new("a.mp3")));
        assert!(!is_video_file(Path::new("mp4")));
    }
}
