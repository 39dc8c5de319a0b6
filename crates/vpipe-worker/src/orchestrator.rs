//! Job orchestration.
//!
//! Each submitted job gets one monitor task that drives its pipeline process
//! to completion. The monitor is the only writer of a job's progress and
//! outcome; `cancel` is the only other writer, and it also signals the
//! monitor to kill the process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use vpipe_media::{
    estimate_progress, latest_video_stem, source_name_from_path, ArtifactResolver, ProcessRunner,
    RunningProcess,
};
use vpipe_models::{InputMethod, JobId, JobParameters, JobRecord, JobStatus, OutputFile};

use crate::command::build_pipeline_command;
use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::registry::JobRegistry;

/// How a monitor finished without an error.
#[derive(Debug)]
enum MonitorOutcome {
    Completed { artifacts: usize },
    Cancelled,
}

/// Creates jobs and runs one pipeline process per job.
#[derive(Clone)]
pub struct JobOrchestrator {
    config: Arc<PipelineConfig>,
    registry: JobRegistry,
    runner: ProcessRunner,
    resolver: ArtifactResolver,
    cancels: Arc<Mutex<HashMap<JobId, watch::Sender<bool>>>>,
}

impl JobOrchestrator {
    /// Create an orchestrator over `registry`.
    pub fn new(config: PipelineConfig, registry: JobRegistry) -> Self {
        let resolver = ArtifactResolver::new(&config.workspace_dir, &config.output_dir)
            .with_marker_prefix(&config.artifact_prefix);
        Self {
            config: Arc::new(config),
            registry,
            runner: ProcessRunner::new(),
            resolver,
            cancels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate parameters, store a pending job and start its monitor.
    ///
    /// Returns as soon as the job is recorded; the pipeline runs in the
    /// background.
    pub async fn submit(&self, params: JobParameters) -> WorkerResult<JobRecord> {
        params.validate()?;

        let record = JobRecord::new(params);
        let id = record.id.clone();
        let method = record.params.input_method;
        self.registry.create(record.clone()).await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancels.lock().await.insert(id.clone(), cancel_tx);

        metrics::record_job_submitted(method);
        let logger = JobLogger::new(&id, method);
        logger.submitted(&record.params.source);

        let span = logger.span();
        let orchestrator = self.clone();
        tokio::spawn(
            async move { orchestrator.monitor(id, method, cancel_rx, logger).await }
                .instrument(span),
        );

        Ok(record)
    }

    /// Cancel a pending or running job and stop its process.
    pub async fn cancel(&self, id: &JobId) -> WorkerResult<JobRecord> {
        let cancelled = self
            .registry
            .update(id, |r| if r.cancel() { Ok(r.clone()) } else { Err(r.status) })
            .await?;

        let record = cancelled.map_err(|status| WorkerError::InvalidTransition {
            id: id.clone(),
            status,
        })?;

        if let Some(tx) = self.cancels.lock().await.get(id) {
            // The monitor may already be gone.
            let _ = tx.send(true);
        }

        metrics::record_job_cancelled(record.params.input_method);
        info!(job_id = %id, "Job cancelled");
        Ok(record)
    }

    /// Snapshot of one job.
    pub async fn get(&self, id: &JobId) -> WorkerResult<JobRecord> {
        self.registry.get(id).await
    }

    /// Snapshot of all jobs, newest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        self.registry.list().await
    }

    /// Snapshot of one job with its artifact list filled in.
    ///
    /// A completed job whose list came back empty is searched once more and
    /// the result cached, in case the pipeline flushed files late.
    pub async fn artifacts(&self, id: &JobId) -> WorkerResult<JobRecord> {
        let record = self.registry.get(id).await?;
        if record.status != JobStatus::Completed || !record.output_files.is_empty() {
            return Ok(record);
        }

        let files = self.resolve_artifacts(&record.params).await;
        if files.is_empty() {
            return Ok(record);
        }
        self.registry
            .update(id, |r| {
                r.cache_output_files(files);
                r.clone()
            })
            .await
    }

    /// Search the output tree for a job's artifacts.
    ///
    /// Resolution problems are logged and reported as "no artifacts".
    pub async fn resolve_artifacts(&self, params: &JobParameters) -> Vec<OutputFile> {
        let source_name = match params.input_method {
            InputMethod::Manual => source_name_from_path(&params.source),
            InputMethod::Youtube => match latest_video_stem(&self.config.input_dir).await {
                Ok(stem) => stem,
                Err(e) => {
                    warn!("Failed to scan input directory: {}", e);
                    None
                }
            },
        };

        let Some(source_name) = source_name else {
            debug!("No source name for artifact lookup");
            return Vec::new();
        };

        match self.resolver.resolve(&source_name).await {
            Ok(files) => files,
            Err(e) => {
                warn!(source = %source_name, "Failed to resolve artifacts: {}", e);
                Vec::new()
            }
        }
    }

    async fn monitor(
        self,
        id: JobId,
        method: InputMethod,
        cancel: watch::Receiver<bool>,
        logger: JobLogger,
    ) {
        match self.drive(&id, cancel, &logger).await {
            Ok(MonitorOutcome::Completed { artifacts }) => {
                metrics::record_job_completed(method);
                logger.completed(artifacts);
            }
            Ok(MonitorOutcome::Cancelled) => {}
            Err(e) => {
                let message = e.to_string();
                logger.failed(&message);
                match self.registry.update(&id, |r| r.fail(message)).await {
                    Ok(true) => metrics::record_job_failed(method),
                    Ok(false) => debug!("Job already terminal, failure not recorded"),
                    Err(e) => warn!(job_id = %id, "Failed to record failure: {}", e),
                }
            }
        }

        self.cancels.lock().await.remove(&id);
    }

    async fn drive(
        &self,
        id: &JobId,
        mut cancel: watch::Receiver<bool>,
        logger: &JobLogger,
    ) -> WorkerResult<MonitorOutcome> {
        if !self.registry.update(id, |r| r.start()).await? {
            logger.cancelled_before_start();
            return Ok(MonitorOutcome::Cancelled);
        }
        let params = self.registry.get(id).await?.params;

        let command = build_pipeline_command(&params, &self.config)?;
        if *cancel.borrow() {
            logger.cancelled_before_start();
            return Ok(MonitorOutcome::Cancelled);
        }

        let mut process = self.runner.spawn(&command)?;
        logger.pipeline_started(process.id());

        let mut last_progress = Instant::now();
        let mut cancel_open = true;

        // Output phase: runs until both pipes close.
        loop {
            tokio::select! {
                changed = cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                    } else if *cancel.borrow() {
                        kill_on_cancel(&mut process, logger).await;
                        return Ok(MonitorOutcome::Cancelled);
                    }
                }
                line = process.next_line() => {
                    let Some(line) = line else { break };
                    logger.output_line(&line);

                    let estimate = estimate_progress(&line);
                    let liveness_due = last_progress.elapsed() > self.config.liveness_interval;
                    let advanced = self
                        .registry
                        .update(id, |r| {
                            r.append_output(&line);
                            match estimate {
                                Some(value) => r.apply_estimate(value),
                                None if liveness_due => r.bump_liveness(),
                                None => false,
                            }
                        })
                        .await?;
                    if advanced {
                        last_progress = Instant::now();
                    }
                }
            }
        }

        // Exit phase: the process may keep running with its output detached.
        let exit = loop {
            tokio::select! {
                changed = cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                    } else if *cancel.borrow() {
                        kill_on_cancel(&mut process, logger).await;
                        return Ok(MonitorOutcome::Cancelled);
                    }
                }
                exit = process.wait() => break exit?,
            }
        };

        logger.pipeline_exited(exit.code);
        if !exit.success() {
            return Err(match exit.code {
                Some(code) => WorkerError::PipelineExit(code),
                None => WorkerError::PipelineSignalled,
            });
        }

        let files = self.resolve_artifacts(&params).await;
        let artifacts = files.len();
        if self.registry.update(id, |r| r.complete(files)).await? {
            Ok(MonitorOutcome::Completed { artifacts })
        } else {
            Ok(MonitorOutcome::Cancelled)
        }
    }
}

async fn kill_on_cancel(process: &mut RunningProcess, logger: &JobLogger) {
    let pid = process.id();
    match process.kill().await {
        Ok(()) => logger.killed_on_cancel(pid),
        Err(e) => logger.kill_failed(&e),
    }
}
