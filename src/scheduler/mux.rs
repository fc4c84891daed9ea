//! Fan-in task multiplexer.
//!
//! Many per-file sources, one outbound task stream. Sources register at
//! any time; the run loop serves the source at the front of its queue
//! until that source is exhausted, then moves to the next one. This
//! file-at-a-time draining is a deliberate ordering choice, not an
//! accident of the queue: one file finishes before the next starts.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::source::{BlockTask, BlockTaskSource};

/// Handle to the running multiplexer. Dropping it (or calling
/// `shutdown`) closes registration, which stops the run loop once the
/// queued sources are drained or the task consumer goes away.
pub struct TaskScheduler {
    source_tx: mpsc::Sender<BlockTaskSource>,
    handle: JoinHandle<()>,
}

impl TaskScheduler {
    /// Start the run loop. The returned receiver is the single outbound
    /// task stream; hand it to the worker pool.
    pub fn spawn() -> (Self, mpsc::Receiver<BlockTask>) {
        let (source_tx, source_rx) = mpsc::channel(1);
        let (task_tx, task_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run(source_rx, task_tx));
        (Self { source_tx, handle }, task_rx)
    }

    /// Register a new source. Safe to call from any task at any time;
    /// fails only after shutdown.
    pub async fn add_source(&self, source: BlockTaskSource) -> Result<()> {
        self.source_tx
            .send(source)
            .await
            .map_err(|_| anyhow!("task scheduler is stopped"))
    }

    /// Close registration and wait for the run loop to stop. Queued
    /// sources keep draining while the task receiver is alive; drop the
    /// receiver to abandon undelivered tasks.
    pub async fn shutdown(self) {
        drop(self.source_tx);
        let _ = self.handle.await;
    }
}

async fn run(mut source_rx: mpsc::Receiver<BlockTaskSource>, task_tx: mpsc::Sender<BlockTask>) {
    let mut queue: VecDeque<BlockTaskSource> = VecDeque::new();
    loop {
        // Take any pending registrations without blocking.
        while let Ok(source) = source_rx.try_recv() {
            tracing::debug!(file_key = source.file_key(), "source registered");
            queue.push_back(source);
        }
        if queue.is_empty() {
            // Nothing to serve: block until a source registers, or stop
            // once registration is closed.
            match source_rx.recv().await {
                Some(source) => {
                    tracing::debug!(file_key = source.file_key(), "source registered");
                    queue.push_back(source);
                }
                None => return,
            }
        }

        let Some(front) = queue.front_mut() else {
            continue;
        };
        if front.remaining() == 0 {
            let retired = queue.pop_front();
            if let Some(retired) = retired {
                tracing::debug!(file_key = retired.file_key(), "source exhausted");
            }
            continue;
        }
        let Some(task) = front.next_task() else {
            queue.pop_front();
            continue;
        };
        if front.remaining() == 0 {
            if let Some(retired) = queue.pop_front() {
                tracing::debug!(file_key = retired.file_key(), "source exhausted");
            }
        }
        // Blocking handoff: wait for a worker to accept. A dropped
        // receiver means the consumer is gone, so stop.
        if task_tx.send(task).await.is_err() {
            return;
        }
    }
}
