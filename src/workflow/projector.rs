// Derived status projection. One linear scan over the five stage records
// replaces the per-stage queries the old system issued; everything here is
// pure and total so it stays testable without a database.

use serde::{Deserialize, Serialize};

use crate::workflow::record::{StageRecordSet, StageStatus};
use crate::workflow::stage::Stage;

/// The single overall view computed from the five per-stage statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStatus {
    /// Human-readable overall status, e.g. `pending_divisional`,
    /// `ict_director_rejected`, `approved`, `implemented`.
    pub overall: String,
    /// The stage whose approver must act next, if any.
    pub next_stage: Option<Stage>,
    /// Share of stages cleared, 0..=100.
    pub progress_percent: u8,
    /// All five stages cleared and the final stage implemented.
    pub is_complete: bool,
    /// Some stage rejected the request; the workflow is halted.
    pub is_rejected: bool,
}

/// Project the overall status from one stage tuple.
///
/// Total for every combination of the five statuses, including ones the
/// invariants forbid: a rejection anywhere halts the view at the first
/// rejected stage in catalog order, regardless of later out-of-order data.
pub fn project(stages: &StageRecordSet) -> DerivedStatus {
    let cleared = Stage::ALL
        .iter()
        .filter(|s| stages.status(**s).is_cleared())
        .count();
    let progress_percent = (cleared * 100 / Stage::COUNT) as u8;

    // First rejection in order wins over anything written after it.
    if let Some(rejected) = Stage::ALL
        .iter()
        .find(|s| stages.status(**s) == StageStatus::Rejected)
    {
        return DerivedStatus {
            overall: format!("{}_rejected", rejected.name()),
            next_stage: None,
            progress_percent,
            is_complete: false,
            is_rejected: true,
        };
    }

    if let Some(pending) = Stage::ALL
        .iter()
        .find(|s| stages.status(**s) == StageStatus::Pending)
    {
        return DerivedStatus {
            overall: format!("pending_{}", pending.name()),
            next_stage: Some(*pending),
            progress_percent,
            is_complete: false,
            is_rejected: false,
        };
    }

    // All decided, none rejected. Implemented only counts when the final
    // stage actually reached it; "all approved" is the in-between state
    // where implementation has not happened yet.
    if stages.status(Stage::IctOfficer) == StageStatus::Implemented {
        DerivedStatus {
            overall: "implemented".to_string(),
            next_stage: None,
            progress_percent,
            is_complete: true,
            is_rejected: false,
        }
    } else {
        DerivedStatus {
            overall: "approved".to_string(),
            next_stage: None,
            progress_percent,
            is_complete: false,
            is_rejected: false,
        }
    }
}
