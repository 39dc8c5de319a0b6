//! A workspace configured by relative path.
//!
//! Kept in its own test binary because it changes the process working
//! directory.

use std::time::Duration;

use tempfile::TempDir;
use vpipe_models::{JobParameters, JobStatus};
use vpipe_worker::{JobOrchestrator, JobRegistry, PipelineConfig};

#[tokio::test]
async fn test_relative_workspace_runs_pipeline() {
    let root = TempDir::new().unwrap();
    let workspace = root.path().join("ws");
    std::fs::create_dir_all(workspace.join("input_videos")).unwrap();
    std::fs::write(workspace.join("input_videos/a.mp4"), b"source").unwrap();
    std::fs::write(
        workspace.join("run.sh"),
        "#!/bin/sh\n\
         test -f \"$1\" || exit 4\n\
         mkdir -p output_videos_latest/a/final_without_post_process_1\n\
         printf v > output_videos_latest/a/final_without_post_process_1/a_out.mp4\n",
    )
    .unwrap();

    std::env::set_current_dir(root.path()).unwrap();
    let config = PipelineConfig::for_workspace("ws").with_pipeline("sh", "run.sh");
    let orchestrator = JobOrchestrator::new(config, JobRegistry::new());

    let id = orchestrator
        .submit(JobParameters::manual("input_videos/a.mp4"))
        .await
        .unwrap()
        .id;

    let mut record = orchestrator.get(&id).await.unwrap();
    for _ in 0..200 {
        if record.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        record = orchestrator.get(&id).await.unwrap();
    }

    assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    assert_eq!(record.output_files.len(), 1);
    assert_eq!(
        record.output_files[0].relative_path,
        "output_videos_latest/a/final_without_post_process_1/a_out.mp4"
    );
}
