//! Background delivery of notifications.
//!
//! Handlers enqueue without waiting on the transport. A single worker task
//! owns the receiving end, sends each notification in order, and retries
//! transient transport failures with linear backoff. The worker exits once every
//! [`NotificationQueue`] handle has been dropped and the channel is drained.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Notification, NotificationDispatcher};

/// Tuning for the notification worker.
#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Pending notifications before `enqueue` starts dropping.
    pub capacity: usize,
    /// Delivery attempts per notification, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; the nth retry waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Sending half of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    /// Start the worker with default options.
    #[must_use]
    pub fn spawn(dispatcher: NotificationDispatcher) -> (Self, JoinHandle<()>) {
        Self::spawn_with(dispatcher, QueueOptions::default())
    }

    /// Start the worker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_with(
        dispatcher: NotificationDispatcher,
        options: QueueOptions,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(options.capacity.max(1));
        let worker = tokio::spawn(run_worker(dispatcher, rx, options));
        (Self { tx }, worker)
    }

    /// Queue a notification for delivery.
    ///
    /// Never blocks. A full or closed queue drops the notification with a
    /// warning; the caller's own work is not affected.
    pub fn enqueue(&self, notification: Notification) {
        let kind = notification.kind;
        match self.tx.try_send(notification) {
            Ok(()) => debug!(kind = %kind, "Notification queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind = %kind, "Notification queue full, dropping notification");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(kind = %kind, "Notification worker stopped, dropping notification");
            }
        }
    }
}

async fn run_worker(
    dispatcher: NotificationDispatcher,
    mut rx: mpsc::Receiver<Notification>,
    options: QueueOptions,
) {
    while let Some(notification) = rx.recv().await {
        deliver(&dispatcher, &notification, options).await;
    }
    debug!("Notification worker stopped");
}

async fn deliver(
    dispatcher: &NotificationDispatcher,
    notification: &Notification,
    options: QueueOptions,
) {
    let mut attempt: u32 = 1;
    loop {
        match dispatcher.send(notification).await {
            Ok(()) => return,
            Err(e) if e.is_retryable() && attempt < options.max_attempts => {
                warn!(
                    kind = %notification.kind,
                    attempt,
                    error = %e,
                    "Notification delivery failed, retrying"
                );
                tokio::time::sleep(options.backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    kind = %notification.kind,
                    attempt,
                    error = %e,
                    "Notification dropped"
                );
                return;
            }
        }
    }
}
