use es_core::{Error, Result, Signal};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{error, info};
use uuid::Uuid;

use crate::pipeline::{RefreshCounts, SignalPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    Refresh,
    Reprocess { article_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutput {
    Refresh(RefreshCounts),
    Reprocess(Signal),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed { output: JobOutput },
    Failed { error: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

/// Finished statuses kept for polling before the oldest are evicted.
pub const DEFAULT_RETAINED_JOBS: usize = 1024;

/// Job statuses. Pending and running jobs are always kept; finished ones are
/// evicted oldest first once more than `retain_finished` have accumulated.
#[derive(Debug)]
struct JobTable {
    statuses: HashMap<Uuid, JobStatus>,
    finished: VecDeque<Uuid>,
    retain_finished: usize,
}

impl JobTable {
    fn new(retain_finished: usize) -> Self {
        Self {
            statuses: HashMap::new(),
            finished: VecDeque::new(),
            retain_finished: retain_finished.max(1),
        }
    }

    fn set(&mut self, id: Uuid, status: JobStatus) {
        let finished = status.is_finished();
        self.statuses.insert(id, status);
        if finished {
            self.finished.push_back(id);
            while self.finished.len() > self.retain_finished {
                if let Some(evicted) = self.finished.pop_front() {
                    self.statuses.remove(&evicted);
                }
            }
        }
    }
}

type StatusMap = Arc<RwLock<JobTable>>;

/// Runs submitted jobs one after another on its own task.
pub struct Worker {
    pipeline: SignalPipeline,
    receiver: mpsc::Receiver<(Uuid, Job)>,
    statuses: StatusMap,
    job_timeout: Option<Duration>,
}

/// Cheap handle for submitting jobs and polling their status.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<(Uuid, Job)>,
    statuses: StatusMap,
}

impl Worker {
    /// Starts the worker. It stops once every handle is dropped.
    ///
    /// A job running longer than `job_timeout` is abandoned and marked failed.
    pub fn spawn(
        pipeline: SignalPipeline,
        queue_size: usize,
        job_timeout: Option<Duration>,
    ) -> (WorkerHandle, JoinHandle<()>) {
        Self::spawn_with_retention(pipeline, queue_size, job_timeout, DEFAULT_RETAINED_JOBS)
    }

    /// Like `spawn`, keeping at most `retain_finished` finished job statuses.
    pub fn spawn_with_retention(
        pipeline: SignalPipeline,
        queue_size: usize,
        job_timeout: Option<Duration>,
        retain_finished: usize,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let statuses: StatusMap = Arc::new(RwLock::new(JobTable::new(retain_finished)));
        let worker = Worker {
            pipeline,
            receiver,
            statuses: statuses.clone(),
            job_timeout,
        };
        let join = tokio::spawn(worker.run());
        (WorkerHandle { sender, statuses }, join)
    }

    async fn run(mut self) {
        info!("👷 Worker started");
        while let Some((id, job)) = self.receiver.recv().await {
            self.set_status(id, JobStatus::Running).await;
            info!("👷 Job {} started: {:?}", id, job);

            let result = match self.job_timeout {
                Some(limit) => timeout(limit, execute(&self.pipeline, job))
                    .await
                    .unwrap_or_else(|_| Err(format!("timed out after {:?}", limit))),
                None => execute(&self.pipeline, job).await,
            };

            let status = match result {
                Ok(output) => {
                    info!("✅ Job {} completed", id);
                    JobStatus::Completed { output }
                }
                Err(reason) => {
                    error!("❌ Job {} failed: {}", id, reason);
                    JobStatus::Failed { error: reason }
                }
            };
            self.set_status(id, status).await;
        }
        info!("👷 Worker stopped");
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) {
        self.statuses.write().await.set(id, status);
    }
}

async fn execute(pipeline: &SignalPipeline, job: Job) -> std::result::Result<JobOutput, String> {
    let output = match job {
        Job::Refresh => pipeline.refresh().await.map(|summary| JobOutput::Refresh(summary.counts())),
        Job::Reprocess { article_id } => pipeline.reprocess(article_id).await.map(JobOutput::Reprocess),
    };
    output.map_err(|e: Error| e.to_string())
}

impl WorkerHandle {
    /// Queues `job` and returns its id; the job starts as `Pending`.
    pub async fn submit(&self, job: Job) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.statuses.write().await.set(id, JobStatus::Pending);
        if self.sender.send((id, job)).await.is_err() {
            self.statuses.write().await.statuses.remove(&id);
            return Err(Error::Config("worker is not running".to_string()));
        }
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.statuses.read().await.statuses.get(&id).cloned()
    }

    /// Polls until the job finishes. `None` for unknown ids.
    pub async fn wait(&self, id: Uuid, poll_interval: Duration) -> Option<JobStatus> {
        loop {
            let status = self.status(id).await?;
            if status.is_finished() {
                return Some(status);
            }
            sleep(poll_interval).await;
        }
    }
}
