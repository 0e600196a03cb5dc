//! Bounded background execution of [`MemoryEngine::process`].
//!
//! The chat path hands completed turns to a [`MemoryWorker`] and moves on.
//! A fixed number of tasks drain a bounded queue, so load is capped and
//! every failure ends up in the log and in [`WorkerStats`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::memory::UserId;
use crate::orchestrator::{MemoryEngine, TurnOutcome};

/// One completed conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user_id: UserId,
    pub user_message: String,
    pub assistant_reply: String,
}

impl Turn {
    pub fn new(
        user_id: impl Into<UserId>,
        user_message: impl Into<String>,
        assistant_reply: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_message: user_message.into(),
            assistant_reply: assistant_reply.into(),
        }
    }
}

/// Counters across all worker tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Turns handled without error (including skipped ones)
    pub processed: u64,
    /// Turns skipped by triage
    pub skipped: u64,
    /// Turns whose processing returned an error
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fixed pool of tasks draining a bounded turn queue.
pub struct MemoryWorker {
    sender: mpsc::Sender<Turn>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl MemoryWorker {
    /// Start the pool. Must be called inside a Tokio runtime.
    pub fn spawn(engine: Arc<MemoryEngine>, config: WorkerConfig) -> Self {
        let config = config.clamped();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let handles = (0..config.workers)
            .map(|worker_id| {
                let engine = Arc::clone(&engine);
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(turn) = next else {
                            break;
                        };
                        run_turn(&engine, &counters, worker_id, turn).await;
                    }
                    debug!(worker_id, "Memory worker stopped");
                })
            })
            .collect();

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Memory workers started"
        );

        Self {
            sender,
            handles,
            counters,
        }
    }

    /// Queue a turn, waiting for space if the queue is full.
    pub async fn submit(&self, turn: Turn) -> Result<()> {
        self.sender
            .send(turn)
            .await
            .map_err(|_| Error::WorkerClosed)
    }

    /// Queue a turn without waiting.
    pub fn try_submit(&self, turn: Turn) -> Result<()> {
        self.sender.try_send(turn).map_err(|e| match e {
            TrySendError::Full(turn) => {
                warn!(user_id = %turn.user_id, "Memory queue full, dropping turn");
                Error::QueueFull
            }
            TrySendError::Closed(_) => Error::WorkerClosed,
        })
    }

    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Stop accepting turns, drain the backlog, and wait for every task.
    pub async fn shutdown(self) -> WorkerStats {
        let Self {
            sender,
            handles,
            counters,
        } = self;
        drop(sender);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "Memory worker task panicked");
            }
        }

        let stats = counters.snapshot();
        info!(
            processed = stats.processed,
            failed = stats.failed,
            "Memory workers shut down"
        );
        stats
    }
}

async fn run_turn(engine: &MemoryEngine, counters: &Counters, worker_id: usize, turn: Turn) {
    match engine
        .process(&turn.user_id, &turn.user_message, &turn.assistant_reply)
        .await
    {
        Ok(outcome) => {
            counters.processed.fetch_add(1, Ordering::Relaxed);
            if outcome == TurnOutcome::Skipped {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(worker_id, user_id = %turn.user_id, error = %e, "Memory processing failed");
        }
    }
}
