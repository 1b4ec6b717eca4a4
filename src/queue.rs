//! Fire-and-forget processing of audio donations.
//!
//! [`AudioQueue::enqueue`] never waits for the job. A single worker drains
//! jobs in arrival order; their success or failure is only visible in the
//! logs. Dropping every queue handle lets the worker finish the backlog and
//! exit, which is how shutdown drains accepted donations.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::pipeline::{AudioJob, Pipeline};

/// The worker is gone; the job was dropped and its file removed.
#[derive(Debug, thiserror::Error)]
#[error("audio queue is closed")]
pub struct QueueClosed;

/// Sending side of the background audio queue.
#[derive(Clone)]
pub struct AudioQueue {
    tx: mpsc::UnboundedSender<AudioJob>,
}

impl AudioQueue {
    /// Start the worker and return the queue handle plus the worker task.
    pub fn spawn(pipeline: Arc<Pipeline>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, pipeline));
        (Self { tx }, worker)
    }

    /// Hand a job to the worker without waiting for it.
    pub fn enqueue(&self, job: AudioJob) -> Result<(), QueueClosed> {
        self.tx.send(job).map_err(|_| QueueClosed)
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<AudioJob>, pipeline: Arc<Pipeline>) {
    debug!("audio worker started");
    while let Some(job) = rx.recv().await {
        let pipeline = pipeline.clone();
        // own task so a panicking job does not take the worker down
        let res = tokio::spawn(async move { pipeline.run_audio(job).await }).await;
        if let Err(e) = res {
            error!(?e, "audio task panicked");
        }
    }
    info!("audio worker finished");
}
