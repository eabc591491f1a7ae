//! Outbound status updates.
//!
//! Enrichment never writes to the store directly. It appends [`StatusUpdate`] commands to a
//! [`StatusCommandQueue`]; whoever owns the receiving end decides how they are applied.
//! In the server that is the [`StatusWriter`] background task, which applies each command
//! and only logs failures. The status the user already sees is never rolled back.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::UserStore,
    models::{ShowStatus, UserId},
};

/// Move every listed show of `user` from `from` to `status`.
///
/// Shows no longer in `from` when the update is applied keep their current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub user: UserId,
    pub show_ids: Vec<Uuid>,
    pub from: ShowStatus,
    pub status: ShowStatus,
}

/// Sending half of the status command channel
#[derive(Clone)]
pub struct StatusCommandQueue {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusCommandQueue {
    /// Creates a queue together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Appends a command without waiting for it to be applied
    pub fn push(&self, update: StatusUpdate) {
        if update.show_ids.is_empty() {
            return;
        }

        if let Err(e) = self.tx.send(update) {
            tracing::error!(
                user_id = %e.0.user,
                shows = e.0.show_ids.len(),
                "Status writer is gone, dropping status update"
            );
        }
    }
}

/// Handle for gracefully shutting down the status writer
pub struct StatusWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl StatusWriterHandle {
    /// Signals the writer to apply the commands already queued, then waits for it to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Status writer task failed");
        }
    }
}

/// Applies queued status updates to the user-data store
pub struct StatusWriter;

impl StatusWriter {
    /// Spawns the writer task and returns the queue that feeds it
    pub fn spawn(store: Arc<dyn UserStore>) -> (StatusCommandQueue, StatusWriterHandle) {
        let (queue, rx) = StatusCommandQueue::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::run(store, rx, shutdown_rx));

        (queue, StatusWriterHandle { shutdown_tx, task })
    }

    async fn run(
        store: Arc<dyn UserStore>,
        mut rx: mpsc::UnboundedReceiver<StatusUpdate>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Status writer task started");

        loop {
            tokio::select! {
                Some(update) = rx.recv() => {
                    Self::apply(store.as_ref(), update).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Status writer shutting down, flushing queued updates");
                    while let Ok(update) = rx.try_recv() {
                        Self::apply(store.as_ref(), update).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("Status writer task stopped");
    }

    async fn apply(store: &dyn UserStore, update: StatusUpdate) {
        let requested = update.show_ids.len();
        match store
            .update_status_batch(update.user, update.show_ids, update.from, update.status)
            .await
        {
            Ok(updated) => tracing::info!(
                user_id = %update.user,
                status = %update.status,
                requested,
                updated,
                "Applied automatic status update"
            ),
            Err(e) => tracing::error!(
                user_id = %update.user,
                status = %update.status,
                requested,
                error = %e,
                "Failed to persist automatic status update"
            ),
        }
    }
}
