// Transition guard: validates one stage decision against the request's
// current state and commits it with compare-and-swap. The CAS on the stage's
// prior status is the whole concurrency story; a losing racer sees
// AlreadyDecided instead of overwriting the winner.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::store::{ApproverDirectory, RequestStore};
use crate::workflow::error::{Decision, WorkflowError};
use crate::workflow::legacy;
use crate::workflow::record::{AccessRequest, Actor, RequestId, StageRecord, StageStatus};
use crate::workflow::stage::Stage;

/// One inbound decision: who is acting, on which stage, and how.
#[derive(Debug, Clone)]
pub struct DecisionCommand {
    pub request_id: RequestId,
    pub stage: Stage,
    pub actor: Actor,
    pub decision: Decision,
    pub comment: Option<String>,
}

pub struct TransitionGuard {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn ApproverDirectory>,
}

impl TransitionGuard {
    pub fn new(store: Arc<dyn RequestStore>, directory: Arc<dyn ApproverDirectory>) -> Self {
        Self { store, directory }
    }

    /// Validate and commit one stage decision, returning the updated request.
    ///
    /// Preconditions are checked in a fixed order, short-circuiting on the
    /// first failure: existence, authorization, ordering, prior status,
    /// decision validity.
    pub async fn decide(&self, cmd: &DecisionCommand) -> Result<AccessRequest, WorkflowError> {
        let mut request = self
            .store
            .load_request(&cmd.request_id)
            .await?
            .ok_or(WorkflowError::NotFound(cmd.request_id))?;

        // Old rows carry their state only in the legacy column. Write the
        // mapped tuple into the per-stage columns first so the CAS below
        // runs against real data; concurrent callers write the same mapping.
        if request.is_legacy() {
            let raw = request.legacy_status.as_deref().unwrap_or_default();
            let mapped = legacy::map_legacy_status(raw);
            self.store
                .materialize_legacy_stages(&request.id, &mapped)
                .await?;
            request.stages = mapped;
        }

        self.check_authorization(&request, cmd).await?;

        for earlier in cmd.stage.earlier() {
            if !request.stages.status(*earlier).is_cleared() {
                return Err(WorkflowError::OutOfOrder {
                    stage: cmd.stage,
                    waiting_on: *earlier,
                });
            }
        }

        let current = request.stages.status(cmd.stage);
        if current != StageStatus::Pending {
            return Err(WorkflowError::AlreadyDecided {
                stage: cmd.stage,
                status: current,
            });
        }

        if cmd.decision == Decision::Implement && !cmd.stage.is_terminal() {
            return Err(WorkflowError::InvalidDecision {
                stage: cmd.stage,
                decision: cmd.decision,
            });
        }

        let record = StageRecord {
            status: cmd.decision.resulting_status(),
            actor_id: Some(cmd.actor.id.clone()),
            actor_name: Some(cmd.actor.name.clone()),
            decided_at: Some(Utc::now()),
            comment: cmd.comment.clone(),
            ..Default::default()
        };

        let swapped = self
            .store
            .compare_and_swap_stage(
                &cmd.request_id,
                cmd.stage,
                StageStatus::Pending,
                record.clone(),
            )
            .await?;

        if !swapped {
            // Lost the race between the precondition read and the write.
            // Re-read so the conflict error carries the winner's status.
            let status = self
                .store
                .load_request(&cmd.request_id)
                .await?
                .map(|r| r.stages.status(cmd.stage))
                .unwrap_or(StageStatus::Pending);
            warn!(
                request_id = %cmd.request_id,
                stage = %cmd.stage,
                actor_id = %cmd.actor.id,
                "decision lost compare-and-swap race"
            );
            return Err(WorkflowError::AlreadyDecided {
                stage: cmd.stage,
                status,
            });
        }

        info!(
            request_id = %cmd.request_id,
            stage = %cmd.stage,
            decision = %cmd.decision,
            actor_id = %cmd.actor.id,
            actor_name = %cmd.actor.name,
            "stage decision committed"
        );

        request.stages.set(cmd.stage, record);
        Ok(request)
    }

    /// Role check, with the department-scoped override for the divisional
    /// stage: holding the divisional director role is not enough, the actor
    /// must be the director assigned to the request's department.
    async fn check_authorization(
        &self,
        request: &AccessRequest,
        cmd: &DecisionCommand,
    ) -> Result<(), WorkflowError> {
        if cmd.actor.role != cmd.stage.required_role() {
            return Err(WorkflowError::Unauthorized {
                stage: cmd.stage,
                actor_id: cmd.actor.id.clone(),
            });
        }

        if cmd.stage == Stage::Divisional {
            let assigned = self
                .directory
                .find_approver(Stage::Divisional, &request.department_id)
                .await?;
            match assigned {
                Some(approver) if approver.user_id == cmd.actor.id => {}
                _ => {
                    return Err(WorkflowError::Unauthorized {
                        stage: cmd.stage,
                        actor_id: cmd.actor.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
