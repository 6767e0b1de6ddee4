use thiserror::Error;

use crate::store::{DirectoryError, StoreError};
use crate::workflow::record::{RequestId, StageStatus};
use crate::workflow::stage::Stage;

/// Decision being applied to a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    /// Terminal-stage only: the ICT officer has carried out the request.
    Implement,
}

impl Decision {
    pub fn resulting_status(self) -> StageStatus {
        match self {
            Decision::Approve => StageStatus::Approved,
            Decision::Reject => StageStatus::Rejected,
            Decision::Implement => StageStatus::Implemented,
        }
    }

    /// Clears the stage and unblocks the next one.
    pub fn advances(self) -> bool {
        matches!(self, Decision::Approve | Decision::Implement)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::Implement => "implement",
        };
        f.write_str(name)
    }
}

/// Everything `decide` can report to its caller.
///
/// Notification delivery failures and legacy data inconsistencies are handled
/// internally (retried or logged) and never appear here.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("access request {0} not found")]
    NotFound(RequestId),

    #[error("actor {actor_id} may not decide stage {stage}")]
    Unauthorized { stage: Stage, actor_id: String },

    #[error("stage {waiting_on} must be decided before {stage}")]
    OutOfOrder { stage: Stage, waiting_on: Stage },

    #[error("stage {stage} was already decided ({status})")]
    AlreadyDecided { stage: Stage, status: StageStatus },

    #[error("{decision} is not a valid decision for stage {stage}")]
    InvalidDecision { stage: Stage, decision: Decision },

    #[error("request store failure")]
    Store(#[from] StoreError),

    #[error("approver directory failure")]
    Directory(#[from] DirectoryError),
}

impl WorkflowError {
    /// Conflict errors mean the caller's view is stale and should be
    /// refreshed rather than retried verbatim.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            WorkflowError::OutOfOrder { .. } | WorkflowError::AlreadyDecided { .. }
        )
    }
}
