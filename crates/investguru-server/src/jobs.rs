//! In-process background quote jobs.
//!
//! A bounded channel feeds a fixed set of worker tasks. Each job resolves
//! one symbol through the shared [`QuoteResolver`] and records the outcome
//! in an in-memory table keyed by job id. Finished and failed jobs stay in
//! the table for a retention period and are evicted on later table access.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use investguru_core::QuoteResolver;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex, RwLock,
};
use uuid::Uuid;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(500);
pub const DEFAULT_MAX_TRACKED: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("job queue is full")]
    Full,
    #[error("job queue is closed")]
    Closed,
}

struct QueuedJob {
    id: Uuid,
    symbol: String,
}

struct JobEntry {
    snapshot: JobSnapshot,
    completed_at: Option<Instant>,
}

impl JobEntry {
    fn expired(&self, retention: Duration, now: Instant) -> bool {
        self.completed_at
            .is_some_and(|done| now.saturating_duration_since(done) >= retention)
    }
}

type JobTable = Arc<RwLock<HashMap<Uuid, JobEntry>>>;

/// Handle to the job queue; clones share the same workers and table.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    jobs: JobTable,
    retention: Duration,
    max_tracked: usize,
}

impl JobQueue {
    /// Spawn `workers` worker tasks on the current runtime.
    pub fn start(resolver: QuoteResolver, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let jobs: JobTable = Arc::new(RwLock::new(HashMap::new()));

        for worker in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let jobs = Arc::clone(&jobs);
            let resolver = resolver.clone();
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(job) = next else {
                        tracing::debug!(worker, "job queue closed, worker exiting");
                        break;
                    };
                    run_job(&resolver, &jobs, job).await;
                }
            });
        }

        Self {
            sender,
            jobs,
            retention: DEFAULT_RETENTION,
            max_tracked: DEFAULT_MAX_TRACKED,
        }
    }

    /// How long a finished or failed job stays visible to [`JobQueue::get`].
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Upper bound on jobs held in the table, pending ones included.
    pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked.max(1);
        self
    }

    /// Queue a resolution of `symbol` and return its job id.
    ///
    /// Expired jobs are dropped first. When the table is still at capacity
    /// the oldest completed jobs make room; if every tracked job is pending
    /// the queue reports [`EnqueueError::Full`].
    pub async fn enqueue(&self, symbol: String) -> Result<Uuid, EnqueueError> {
        let mut jobs = self.jobs.write().await;
        let now = Instant::now();
        jobs.retain(|_, entry| !entry.expired(self.retention, now));
        if jobs.len() >= self.max_tracked {
            let excess = jobs.len() + 1 - self.max_tracked;
            evict_oldest_completed(&mut jobs, excess);
        }
        if jobs.len() >= self.max_tracked {
            tracing::warn!(tracked = jobs.len(), "job table is full of pending jobs");
            return Err(EnqueueError::Full);
        }

        let id = Uuid::new_v4();
        self.sender
            .try_send(QueuedJob { id, symbol })
            .map_err(|err| match err {
                TrySendError::Full(_) => EnqueueError::Full,
                TrySendError::Closed(_) => EnqueueError::Closed,
            })?;
        jobs.insert(
            id,
            JobEntry {
                snapshot: JobSnapshot {
                    id,
                    status: JobStatus::Queued,
                    result: None,
                },
                completed_at: None,
            },
        );
        Ok(id)
    }

    pub async fn get(&self, id: &Uuid) -> Option<JobSnapshot> {
        let mut jobs = self.jobs.write().await;
        if jobs
            .get(id)
            .is_some_and(|entry| entry.expired(self.retention, Instant::now()))
        {
            jobs.remove(id);
            tracing::debug!(job_id = %id, "expired job evicted");
            return None;
        }
        jobs.get(id).map(|entry| entry.snapshot.clone())
    }
}

fn evict_oldest_completed(jobs: &mut HashMap<Uuid, JobEntry>, count: usize) {
    let mut completed: Vec<(Instant, Uuid)> = jobs
        .iter()
        .filter_map(|(id, entry)| entry.completed_at.map(|done| (done, *id)))
        .collect();
    completed.sort_unstable();
    for (_, id) in completed.into_iter().take(count) {
        jobs.remove(&id);
    }
}

async fn run_job(resolver: &QuoteResolver, jobs: &JobTable, job: QueuedJob) {
    set_status(jobs, job.id, JobStatus::Started, None).await;
    tracing::info!(job_id = %job.id, symbol = %job.symbol, "job started");

    let (status, result) = match resolver.resolve(&job.symbol).await {
        Ok(quote) => match serde_json::to_value(&quote) {
            Ok(value) => (JobStatus::Finished, value),
            Err(err) => (JobStatus::Failed, json!({ "error": err.to_string() })),
        },
        Err(unresolved) => (
            JobStatus::Failed,
            json!({ "error": unresolved.to_string() }),
        ),
    };

    tracing::info!(job_id = %job.id, status = ?status, "job completed");
    set_status(jobs, job.id, status, Some(result)).await;
}

async fn set_status(jobs: &JobTable, id: Uuid, status: JobStatus, result: Option<Value>) {
    if let Some(entry) = jobs.write().await.get_mut(&id) {
        entry.snapshot.status = status;
        entry.snapshot.result = result;
        if matches!(status, JobStatus::Finished | JobStatus::Failed) {
            entry.completed_at = Some(Instant::now());
        }
    }
}
