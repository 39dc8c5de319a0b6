//! In-memory job registry.
//!
//! The registry owns every job record for the lifetime of the process.
//! Handlers and monitor tasks share it by cloning; all clones see the same
//! map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use vpipe_models::{JobId, JobRecord, JobStatus};

use crate::error::{WorkerError, WorkerResult};

/// Thread-safe job table.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Fails if its ID is already present.
    pub async fn create(&self, record: JobRecord) -> WorkerResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Err(WorkerError::DuplicateJob(record.id));
        }
        jobs.insert(record.id.clone(), record);
        Ok(())
    }

    /// Snapshot of one record.
    pub async fn get(&self, id: &JobId) -> WorkerResult<JobRecord> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WorkerError::NotFound(id.clone()))
    }

    /// Read-modify-write one record under the write lock.
    ///
    /// The mutator sees the stored value, so concurrent updates to the same
    /// job never overwrite each other.
    pub async fn update<F, R>(&self, id: &JobId, mutate: F) -> WorkerResult<R>
    where
        F: FnOnce(&mut JobRecord) -> R,
    {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| WorkerError::NotFound(id.clone()))?;
        Ok(mutate(record))
    }

    /// Snapshot of all records, newest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of jobs that are pending or running.
    pub async fn count_active(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|r| matches!(r.status, JobStatus::Pending | JobStatus::Running))
            .count()
    }
}
