// Core data model: per-stage decision records and the access request that
// carries five of them. Raw null/empty status strings from old rows are
// collapsed to Pending here so nothing downstream ever sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::workflow::legacy;
use crate::workflow::stage::Stage;

/// Opaque identifier for an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Department owning a request, used to resolve the divisional director.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

impl DepartmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of one approval stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Terminal value of the final stage only, replacing `Approved`.
    Implemented,
}

impl StageStatus {
    /// The stage has been acted on (anything but Pending).
    pub fn is_decided(self) -> bool {
        self != StageStatus::Pending
    }

    /// The stage lets the chain continue past it.
    pub fn is_cleared(self) -> bool {
        matches!(self, StageStatus::Approved | StageStatus::Implemented)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Approved => "approved",
            StageStatus::Rejected => "rejected",
            StageStatus::Implemented => "implemented",
        }
    }

    /// Parse a raw status column. NULL, empty and whitespace-only values all
    /// historically meant "no decision yet" and collapse to `Pending`.
    /// Unrecognized text also collapses to `Pending` with a warning so read
    /// paths stay total.
    pub fn from_column(raw: Option<&str>) -> StageStatus {
        let value = match raw {
            None => return StageStatus::Pending,
            Some(v) => v.trim(),
        };
        match value {
            "" | "pending" => StageStatus::Pending,
            "approved" => StageStatus::Approved,
            "rejected" => StageStatus::Rejected,
            "implemented" => StageStatus::Implemented,
            other => {
                tracing::warn!(status = %other, "unrecognized stage status column, treating as pending");
                StageStatus::Pending
            }
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the *next* stage's approver was alerted after this stage cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    NotSent,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::NotSent => "not_sent",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn from_column(raw: Option<&str>) -> NotificationStatus {
        match raw.map(str::trim) {
            Some("sent") => NotificationStatus::Sent,
            Some("failed") => NotificationStatus::Failed,
            _ => NotificationStatus::NotSent,
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage's decision record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub status: StageStatus,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub notification: NotificationStatus,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub notification_error: Option<String>,
}

impl StageRecord {
    /// A record nothing has ever touched. Distinguishes "really all pending"
    /// from "legacy row whose per-stage columns were never written".
    pub fn is_pristine(&self) -> bool {
        self.status == StageStatus::Pending
            && self.actor_id.is_none()
            && self.decided_at.is_none()
            && self.notification == NotificationStatus::NotSent
    }

    /// Record carrying only a status, as produced by the legacy mapping.
    pub fn with_status(status: StageStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

/// The five per-stage records, indexed by [`Stage`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRecordSet {
    records: [StageRecord; Stage::COUNT],
}

impl StageRecordSet {
    /// All five stages pending, nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: Stage) -> &StageRecord {
        &self.records[stage.index()]
    }

    pub fn get_mut(&mut self, stage: Stage) -> &mut StageRecord {
        &mut self.records[stage.index()]
    }

    pub fn set(&mut self, stage: Stage, record: StageRecord) {
        self.records[stage.index()] = record;
    }

    /// Stages with their records, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &StageRecord)> {
        Stage::ALL.iter().map(move |s| (*s, self.get(*s)))
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.get(stage).status
    }

    /// No stage has ever been written.
    pub fn is_pristine(&self) -> bool {
        self.records.iter().all(StageRecord::is_pristine)
    }
}

/// Actor submitting a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: crate::workflow::stage::Role,
}

/// One staff request for IT system access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: RequestId,
    pub department_id: DepartmentId,
    pub requester_name: String,
    pub requester_contact: String,
    /// Free-text summary of what is being requested (module, internet,
    /// device loan). Feeds notification messages only.
    pub requested_access: String,
    pub submitted_at: DateTime<Utc>,
    pub stages: StageRecordSet,
    /// Old single free-text status, present only on migrated rows.
    pub legacy_status: Option<String>,
}

impl AccessRequest {
    pub fn new(
        department_id: DepartmentId,
        requester_name: impl Into<String>,
        requester_contact: impl Into<String>,
        requested_access: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            department_id,
            requester_name: requester_name.into(),
            requester_contact: requester_contact.into(),
            requested_access: requested_access.into(),
            submitted_at: Utc::now(),
            stages: StageRecordSet::new(),
            legacy_status: None,
        }
    }

    /// The row predates the per-stage columns and is still readable only
    /// through its legacy status.
    pub fn is_legacy(&self) -> bool {
        self.legacy_status.is_some() && self.stages.is_pristine()
    }

    /// The stage view everything downstream reads: the stored columns, or the
    /// legacy mapping when the columns were never written.
    pub fn effective_stages(&self) -> StageRecordSet {
        if self.is_legacy() {
            // is_legacy() guarantees legacy_status is present
            let raw = self.legacy_status.as_deref().unwrap_or_default();
            legacy::map_legacy_status(raw)
        } else {
            self.stages.clone()
        }
    }
}
