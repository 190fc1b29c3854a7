//! Background persistence writer.
//!
//! Mutations hand their freshly serialized snapshot to a single writer task
//! over an unbounded channel, so enqueueing never blocks the caller and writes
//! reach storage in the order they were requested. When several snapshots
//! are queued, only the newest is written: each one overwrites the whole
//! value, so the older ones would be overwritten immediately anyway.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::{CartError, Result};
use crate::storage::KeyValueStore;

/// Counters describing persistence activity since the store was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceStats {
    /// Snapshots handed to the writer.
    pub writes_requested: u64,
    /// Storage writes that succeeded.
    pub writes_completed: u64,
    /// Snapshots skipped because a newer one was already queued.
    pub writes_coalesced: u64,
    /// Storage writes that failed.
    pub writes_failed: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

enum PersistCommand {
    /// Overwrite the stored cart with this JSON payload.
    Write(String),
    /// Reply once every write queued before this command has been applied.
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task owned by a cart store.
pub(crate) struct PersistHandle {
    tx: Mutex<Option<mpsc::UnboundedSender<PersistCommand>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<PersistenceStats>>,
}

impl PersistHandle {
    /// Spawn the writer task on the current tokio runtime.
    pub(crate) fn spawn<S: KeyValueStore>(storage: Arc<S>, key: String) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CartError::Configuration(format!("cart store requires a tokio runtime: {e}"))
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(PersistenceStats::default()));
        let task = runtime.spawn(run_writer(storage, key, rx, Arc::clone(&stats)));

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
            stats,
        })
    }

    /// Queue a snapshot for writing. Never blocks.
    pub(crate) fn enqueue(&self, payload: String) -> Result<()> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(CartError::WriterStopped)?;
        tx.send(PersistCommand::Write(payload))
            .map_err(|_| CartError::WriterStopped)?;
        drop(guard);

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .writes_requested += 1;
        Ok(())
    }

    /// Wait until every snapshot queued so far has been applied.
    pub(crate) async fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            let tx = guard.as_ref().ok_or(CartError::WriterStopped)?;
            tx.send(PersistCommand::Flush(reply_tx))
                .map_err(|_| CartError::WriterStopped)?;
        }
        reply_rx.await.map_err(|_| CartError::WriterStopped)
    }

    /// Stop accepting writes and wait for the queued ones to drain.
    pub(crate) async fn shutdown(&self) {
        // Dropping the sender ends the writer loop once the queue is empty.
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());

        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Persistence writer terminated abnormally");
            }
        }
    }

    pub(crate) fn stats(&self) -> PersistenceStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[instrument(skip(storage, rx, stats))]
async fn run_writer<S: KeyValueStore>(
    storage: Arc<S>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
    stats: Arc<Mutex<PersistenceStats>>,
) {
    debug!("Persistence writer started");

    while let Some(command) = rx.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();
        let mut coalesced = 0u64;

        let mut next = Some(command);
        while let Some(command) = next {
            match command {
                PersistCommand::Write(payload) => {
                    if latest.replace(payload).is_some() {
                        coalesced += 1;
                    }
                }
                PersistCommand::Flush(reply) => waiters.push(reply),
            }
            next = rx.try_recv().ok();
        }

        if let Some(payload) = latest {
            let result = storage.set(&key, payload).await;

            let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.writes_coalesced += coalesced;
            match result {
                Ok(()) => {
                    stats.writes_completed += 1;
                    debug!(coalesced, "Persisted cart snapshot");
                }
                Err(e) => {
                    stats.writes_failed += 1;
                    stats.last_error = Some(e.to_string());
                    warn!(error = %e, "Failed to persist cart snapshot");
                }
            }
        }

        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    debug!("Persistence writer stopped");
}
