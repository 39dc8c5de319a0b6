//! Pipeline process runner.
//!
//! Starts one external process, merges its stdout and stderr into a single
//! line stream, and reports how the process exited.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{resolve_program, PipelineCommand};
use crate::error::{MediaError, MediaResult};

/// Buffered lines between the pipe readers and the consumer.
const LINE_BUFFER: usize = 256;

/// How a pipeline process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Spawns pipeline processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }

    /// Spawn the command with stdin closed and both output pipes captured.
    pub fn spawn(&self, cmd: &PipelineCommand) -> MediaResult<RunningProcess> {
        let program = resolve_program(cmd.program())?;
        debug!("Running pipeline: {}", cmd.display());

        let mut command = Command::new(&program);
        command
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cmd.get_working_dir() {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| MediaError::spawn_failed(cmd.program(), e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        // The channel closes once both readers have hit EOF.
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        Ok(RunningProcess { child, lines: rx })
    }
}

/// A spawned pipeline process.
pub struct RunningProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl RunningProcess {
    /// OS process ID, while the process is alive.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next line of combined output, or `None` once both pipes are closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Wait for the process to exit.
    ///
    /// Cancel safe: the process can still be killed if this future is
    /// dropped before it resolves.
    pub async fn wait(&mut self) -> MediaResult<ProcessExit> {
        // Drop the receiver so readers never block on a full buffer.
        self.lines.close();
        let status = self.child.wait().await?;
        Ok(ProcessExit {
            code: status.code(),
        })
    }

    /// Kill the process and reap it.
    pub async fn kill(&mut self) -> MediaResult<()> {
        self.child.kill().await?;
        Ok(())
    }
}

/// Read `reader` line by line (lossy UTF-8) into `tx` until EOF.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read pipeline output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn collect(cmd: PipelineCommand) -> (Vec<String>, ProcessExit) {
        let mut process = ProcessRunner::new().spawn(&cmd).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        let exit = process.wait().await.unwrap();
        (lines, exit)
    }

    #[tokio::test]
    async fn test_streams_lines_and_exit_code() {
        let cmd = PipelineCommand::new("sh")
            .arg("-c")
            .arg("echo first; echo second; exit 3");
        let (lines, exit) = collect(cmd).await;

        assert_eq!(lines, vec!["first", "second"]);
        assert_eq!(exit.code, Some(3));
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_merges_stderr() {
        let cmd = PipelineCommand::new("sh")
            .arg("-c")
            .arg("echo out; echo err 1>&2");
        let (mut lines, exit) = collect(cmd).await;
        lines.sort();

        assert_eq!(lines, vec!["err", "out"]);
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = PipelineCommand::new("sh")
            .arg("-c")
            .arg("pwd")
            .working_dir(dir.path());
        let (lines, _) = collect(cmd).await;

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(&lines[0]).canonicalize().unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let cmd = PipelineCommand::new("no-such-interpreter-for-tests");
        let err = ProcessRunner::new().spawn(&cmd).err().unwrap();
        assert!(matches!(err, MediaError::InterpreterNotFound(_)));
    }

    #[tokio::test]
    async fn test_kill_reports_signal() {
        let cmd = PipelineCommand::new("sh").arg("-c").arg("sleep 30");
        let mut process = ProcessRunner::new().spawn(&cmd).unwrap();
        process.kill().await.unwrap();
        let exit = process.wait().await.unwrap();
        assert_eq!(exit.code, None);
    }

    #[tokio::test]
    async fn test_kill_after_pipes_close() {
        let cmd = PipelineCommand::new("sh")
            .arg("-c")
            .arg("echo ready; exec >/dev/null 2>&1; sleep 30");
        let mut process = ProcessRunner::new().spawn(&cmd).unwrap();
        assert_eq!(process.next_line().await.as_deref(), Some("ready"));
        assert!(process.next_line().await.is_none());

        let pending = tokio::time::timeout(Duration::from_millis(100), process.wait()).await;
        assert!(pending.is_err());

        process.kill().await.unwrap();
        let exit = process.wait().await.unwrap();
        assert_eq!(exit.code, None);
    }
}
