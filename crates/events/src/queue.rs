//! Deferred jobs and the worker loop that runs them.

use std::sync::Arc;

use async_trait::async_trait;
use refly_core::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default number of queued jobs before `enqueue` waits.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Job {
    /// Remove objects from storage.
    DeleteObjects { keys: Vec<String> },
    /// Recompute the canvas → entity relation index.
    SyncCanvasRelations { canvas_id: String },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeleteObjects { .. } => "delete_objects",
            Self::SyncCanvasRelations { .. } => "sync_canvas_relations",
        }
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> CoreResult<()>;
}

/// Sending half of the job channel.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn enqueue(&self, job: Job) -> CoreResult<()> {
        let name = job.name();
        self.sender
            .send(job)
            .await
            .map_err(|_| CoreError::Internal(format!("job queue closed, dropped {name}")))?;
        tracing::debug!(job = name, "Job enqueued");
        Ok(())
    }
}

/// Run jobs until `cancel` fires or every sender is dropped. Job failures
/// are logged and do not stop the loop.
pub async fn run_worker(
    mut receiver: mpsc::Receiver<Job>,
    handler: Arc<dyn JobHandler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job worker cancelled");
                break;
            }
            job = receiver.recv() => {
                let Some(job) = job else {
                    tracing::info!("Job queue closed, worker shutting down");
                    break;
                };
                let name = job.name();
                if let Err(e) = handler.handle(job).await {
                    tracing::error!(job = name, error = %e, "Job failed");
                }
            }
        }
    }
}
