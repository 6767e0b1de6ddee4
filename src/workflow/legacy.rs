// Legacy status mapping. Records created before the per-stage columns
// existed carry one free-text status; this maps each known value onto the
// five-stage tuple it implied. Runs on read paths for arbitrarily old rows,
// so it is total: anything unrecognized becomes all-Pending with a warning.

use crate::workflow::record::{StageRecord, StageRecordSet, StageStatus};
use crate::workflow::stage::Stage;

/// Map one historical free-text status onto the five-stage tuple.
///
/// Known values: `pending`, `<stage>_approved` / `<stage>_rejected` for each
/// stage, `approved` (all five cleared, final not yet implemented) and
/// `implemented`. Empty or unknown input yields the all-Pending tuple and is
/// logged as a data-quality warning, never an error.
pub fn map_legacy_status(raw: &str) -> StageRecordSet {
    let value = raw.trim().to_ascii_lowercase();

    if value.is_empty() {
        tracing::warn!("empty legacy status, treating as not yet started");
        return StageRecordSet::new();
    }
    if value == "pending" {
        return StageRecordSet::new();
    }
    if value == "approved" {
        return cleared_through(Stage::IctOfficer, StageStatus::Approved);
    }
    if value == "implemented" {
        return cleared_through(Stage::IctOfficer, StageStatus::Implemented);
    }

    for stage in Stage::ALL {
        if value == format!("{}_approved", stage.name()) {
            return cleared_through(stage, StageStatus::Approved);
        }
        if value == format!("{}_rejected", stage.name()) {
            return rejected_at(stage);
        }
    }

    tracing::warn!(legacy_status = %raw, "unknown legacy status, treating as not yet started");
    StageRecordSet::new()
}

/// Every stage up to and including `last` cleared; `last` gets
/// `last_status`, earlier stages get `Approved`, later stages stay pending.
fn cleared_through(last: Stage, last_status: StageStatus) -> StageRecordSet {
    let mut set = StageRecordSet::new();
    for stage in last.earlier() {
        set.set(*stage, StageRecord::with_status(StageStatus::Approved));
    }
    set.set(last, StageRecord::with_status(last_status));
    set
}

/// Earlier stages approved, `stage` rejected, later stages pending.
fn rejected_at(stage: Stage) -> StageRecordSet {
    let mut set = StageRecordSet::new();
    for earlier in stage.earlier() {
        set.set(*earlier, StageRecord::with_status(StageStatus::Approved));
    }
    set.set(stage, StageRecord::with_status(StageStatus::Rejected));
    set
}

/// The full enumeration of known legacy values, used by tests and by data
/// audits against historical rows.
pub fn known_legacy_values() -> Vec<String> {
    let mut values = vec!["pending".to_string()];
    for stage in Stage::ALL {
        values.push(format!("{}_approved", stage.name()));
        values.push(format!("{}_rejected", stage.name()));
    }
    values.push("approved".to_string());
    values.push("implemented".to_string());
    values
}
