// Workflow service: the engine's entire public surface. One call per
// decision, orchestrating guard + projector + legacy mapping, with the
// notification intent enqueued after the commit rather than sent inline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::notify::dispatcher::NotificationIntent;
use crate::store::{ApproverDirectory, RequestStore};
use crate::workflow::error::WorkflowError;
use crate::workflow::guard::{DecisionCommand, TransitionGuard};
use crate::workflow::projector::{self, DerivedStatus};
use crate::workflow::record::{AccessRequest, DepartmentId, RequestId};
use crate::workflow::stage::Stage;

/// Fields needed to open a new request; everything else starts pending.
#[derive(Debug, Clone)]
pub struct NewAccessRequest {
    pub department_id: DepartmentId,
    pub requester_name: String,
    pub requester_contact: String,
    pub requested_access: String,
}

pub struct WorkflowService {
    store: Arc<dyn RequestStore>,
    guard: TransitionGuard,
    outbox: Option<mpsc::Sender<NotificationIntent>>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn RequestStore>, directory: Arc<dyn ApproverDirectory>) -> Self {
        Self {
            guard: TransitionGuard::new(store.clone(), directory),
            store,
            outbox: None,
        }
    }

    /// Attach the intent queue drained by the notification worker. Without
    /// it, intents stay recorded as NotSent and are picked up by sweeps.
    pub fn with_outbox(mut self, outbox: mpsc::Sender<NotificationIntent>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Open a new request with all five stages pending and alert the first
    /// approver.
    pub async fn submit(&self, new: NewAccessRequest) -> Result<AccessRequest, WorkflowError> {
        let request = AccessRequest::new(
            new.department_id,
            new.requester_name,
            new.requester_contact,
            new.requested_access,
        );
        self.store.insert_request(&request).await?;
        info!(
            request_id = %request.id,
            department = %request.department_id,
            "access request submitted"
        );
        self.enqueue(NotificationIntent {
            request_id: request.id,
            from_stage: None,
            to_stage: Stage::Hod,
        });
        Ok(request)
    }

    /// Apply one stage decision and return the fresh derived status.
    ///
    /// On an approval or implementation with a next stage, the next
    /// approver's notification intent is enqueued here but executed by the
    /// worker; a slow SMS gateway never delays the approval commit.
    pub async fn decide(&self, cmd: &DecisionCommand) -> Result<DerivedStatus, WorkflowError> {
        let request = self.guard.decide(cmd).await?;
        let derived = projector::project(&request.stages);

        if cmd.decision.advances() {
            if let Some(next) = cmd.stage.next() {
                self.enqueue(NotificationIntent {
                    request_id: cmd.request_id,
                    from_stage: Some(cmd.stage),
                    to_stage: next,
                });
            }
        }

        Ok(derived)
    }

    /// Current derived status of a request, with legacy rows read through
    /// the migration mapping.
    pub async fn derived_status(&self, id: &RequestId) -> Result<DerivedStatus, WorkflowError> {
        let request = self
            .store
            .load_request(id)
            .await?
            .ok_or(WorkflowError::NotFound(*id))?;
        Ok(projector::project(&request.effective_stages()))
    }

    fn enqueue(&self, intent: NotificationIntent) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        // Full queue is not an error: the NotSent column survives and the
        // next sweep re-drives the intent.
        if let Err(err) = outbox.try_send(intent) {
            warn!(error = %err, "notification intent queue full, leaving for sweep");
        }
    }
}
