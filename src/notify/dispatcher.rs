// Notification dispatch, decoupled from the approval commit. The committed
// stage record with notification = NotSent is the durable intent (outbox);
// dispatch here resolves the next approver, sends through the injected
// channel with bounded retries, and records the terminal outcome exactly
// once per (request, to-stage) pair.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::notify::retry::RetryConfig;
use crate::store::{
    ApproverDirectory, ChannelError, DirectoryError, NotificationChannel, NotificationOutcome,
    RequestStore, StoreError,
};
use crate::workflow::record::{AccessRequest, NotificationStatus, RequestId};
use crate::workflow::stage::Stage;

/// Intent to alert `to_stage`'s approver.
///
/// `from_stage` is the just-cleared stage whose record tracks the delivery
/// outcome; it is `None` for the submission alert to the first approver,
/// which has no prior stage to track on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
    pub request_id: RequestId,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request {0} no longer exists")]
    RequestMissing(RequestId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Terminal result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed,
    /// A Sent (or Failed) outcome already existed for this pair.
    AlreadyHandled,
}

pub struct NotificationDispatcher {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn ApproverDirectory>,
    channel: Arc<dyn NotificationChannel>,
    retry: RetryConfig,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn RequestStore>,
        directory: Arc<dyn ApproverDirectory>,
        channel: Arc<dyn NotificationChannel>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            directory,
            channel,
            retry,
        }
    }

    /// Deliver one intent. Idempotent on `(request_id, to_stage)`: once the
    /// tracking record holds Sent or Failed this is a no-op. Delivery
    /// failure is recorded, never propagated into approval state.
    pub async fn dispatch(
        &self,
        intent: &NotificationIntent,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request = self
            .store
            .load_request(&intent.request_id)
            .await?
            .ok_or(DispatchError::RequestMissing(intent.request_id))?;

        if let Some(from) = intent.from_stage {
            let tracked = request.stages.get(from).notification;
            if tracked != NotificationStatus::NotSent {
                debug!(
                    request_id = %intent.request_id,
                    to_stage = %intent.to_stage,
                    status = %tracked,
                    "notification already handled, skipping"
                );
                return Ok(DispatchOutcome::AlreadyHandled);
            }
        }

        let approver = self
            .directory
            .find_approver(intent.to_stage, &request.department_id)
            .await?;

        let Some(approver) = approver else {
            warn!(
                request_id = %intent.request_id,
                to_stage = %intent.to_stage,
                department = %request.department_id,
                "no approver configured for stage"
            );
            self.record(intent, NotificationOutcome::failed("no approver configured"))
                .await?;
            return Ok(DispatchOutcome::Failed);
        };

        let message = compose_message(&request, intent.to_stage);

        match self.send_with_retry(&approver.contact, &message).await {
            Ok(provider_ref) => {
                info!(
                    request_id = %intent.request_id,
                    to_stage = %intent.to_stage,
                    approver = %approver.user_id,
                    "approver notified"
                );
                self.record(intent, NotificationOutcome::sent(provider_ref))
                    .await?;
                Ok(DispatchOutcome::Sent)
            }
            Err(reason) => {
                error!(
                    request_id = %intent.request_id,
                    to_stage = %intent.to_stage,
                    approver = %approver.user_id,
                    reason = %reason,
                    "notification delivery failed after retries"
                );
                self.record(intent, NotificationOutcome::failed(reason))
                    .await?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    /// Re-drive intents whose approval committed but whose notification was
    /// never delivered (restart, queue overflow). The NotSent column is the
    /// durable outbox this sweep reads.
    ///
    /// Returns the number of intents driven to a terminal outcome. A dispatch
    /// error on one row is logged and the sweep moves on; the row stays
    /// NotSent and the next sweep retries it.
    pub async fn sweep(&self) -> Result<usize, DispatchError> {
        let pending = self.store.find_unnotified().await?;
        let mut dispatched = 0;
        for request in pending {
            for (stage, record) in request.stages.iter() {
                let Some(next) = stage.next() else { continue };
                if record.status.is_cleared()
                    && record.notification == NotificationStatus::NotSent
                {
                    let intent = NotificationIntent {
                        request_id: request.id,
                        from_stage: Some(stage),
                        to_stage: next,
                    };
                    match self.dispatch(&intent).await {
                        Ok(DispatchOutcome::Sent) | Ok(DispatchOutcome::Failed) => {
                            dispatched += 1;
                        }
                        Ok(DispatchOutcome::AlreadyHandled) => {}
                        Err(err) => {
                            warn!(
                                request_id = %intent.request_id,
                                to_stage = %intent.to_stage,
                                error = %err,
                                "sweep dispatch failed, continuing with remaining rows"
                            );
                        }
                    }
                }
            }
        }
        Ok(dispatched)
    }

    async fn record(
        &self,
        intent: &NotificationIntent,
        outcome: NotificationOutcome,
    ) -> Result<(), StoreError> {
        // Submission alerts have no stage record to track on.
        let Some(from) = intent.from_stage else {
            return Ok(());
        };
        self.store
            .record_notification(&intent.request_id, from, outcome)
            .await
    }

    /// Attempt delivery up to `max_attempts` times with backoff. Returns the
    /// provider reference on success, the final failure reason otherwise.
    async fn send_with_retry(
        &self,
        contact: &str,
        message: &str,
    ) -> Result<Option<String>, String> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.channel.send(contact, message).await {
                Ok(receipt) if receipt.delivered => return Ok(receipt.provider_ref),
                Ok(_) => last_error = "provider reported not delivered".to_string(),
                Err(ChannelError::Transport(reason)) => last_error = reason,
            }
            if attempt < attempts {
                let delay = self.retry.delay_for_attempt(attempt);
                debug!(attempt, ?delay, "notification send failed, backing off");
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_error)
    }
}

/// Summary shown to the next approver.
pub fn compose_message(request: &AccessRequest, to_stage: Stage) -> String {
    format!(
        "Access request {id} from {name} ({department}) is awaiting your approval as {title}. Requested: {access}.",
        id = request.id,
        name = request.requester_name,
        department = request.department_id,
        title = to_stage.title(),
        access = request.requested_access,
    )
}
