// Background worker draining the notification intent queue. Keeps external
// sends off the approval path: the service enqueues after commit, delivery
// happens here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::notify::dispatcher::{NotificationDispatcher, NotificationIntent};

/// Default depth of the intent queue. Overflow is tolerable: the NotSent
/// column survives and a sweep picks the intent up later.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub fn intent_queue(
    capacity: usize,
) -> (
    mpsc::Sender<NotificationIntent>,
    mpsc::Receiver<NotificationIntent>,
) {
    mpsc::channel(capacity)
}

pub struct NotificationWorker {
    dispatcher: Arc<NotificationDispatcher>,
    rx: mpsc::Receiver<NotificationIntent>,
}

impl NotificationWorker {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        rx: mpsc::Receiver<NotificationIntent>,
    ) -> Self {
        Self { dispatcher, rx }
    }

    /// Run until every sender is dropped. Dispatch errors are logged and the
    /// loop keeps going; a failed delivery is already recorded as Failed on
    /// the request itself.
    pub async fn run(mut self) {
        info!("notification worker started");
        while let Some(intent) = self.rx.recv().await {
            if let Err(err) = self.dispatcher.dispatch(&intent).await {
                error!(
                    request_id = %intent.request_id,
                    to_stage = %intent.to_stage,
                    error = %err,
                    "notification dispatch failed"
                );
            }
        }
        info!("notification worker stopped");
    }
}
