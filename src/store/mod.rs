// Collaborator seams. The engine owns none of these: persistence, the
// identity directory and the delivery channel are all injected behind traits
// so the workflow stays testable without a database or an SMS gateway.

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::record::{
    AccessRequest, DepartmentId, NotificationStatus, RequestId, StageRecord, StageRecordSet,
    StageStatus,
};
use crate::workflow::stage::Stage;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("approver directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("delivery channel error: {0}")]
    Transport(String),
}

/// Resolved approver for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub user_id: String,
    pub display_name: String,
    pub contact: String,
}

/// Outcome reported by the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub delivered: bool,
    pub provider_ref: Option<String>,
}

/// Terminal notification outcome recorded against a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationOutcome {
    pub status: NotificationStatus,
    pub sent_at: DateTime<Utc>,
    pub provider_ref: Option<String>,
    pub error: Option<String>,
}

impl NotificationOutcome {
    pub fn sent(provider_ref: Option<String>) -> Self {
        Self {
            status: NotificationStatus::Sent,
            sent_at: Utc::now(),
            provider_ref,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: NotificationStatus::Failed,
            sent_at: Utc::now(),
            provider_ref: None,
            error: Some(error.into()),
        }
    }
}

/// Transactional request persistence.
///
/// `compare_and_swap_stage` is the engine's only write path for decisions and
/// doubles as its concurrency control: the write commits only if the stage
/// still holds `expected`, so the loser of a race observes `false` instead of
/// overwriting the winner.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn load_request(&self, id: &RequestId) -> Result<Option<AccessRequest>, StoreError>;

    async fn insert_request(&self, request: &AccessRequest) -> Result<(), StoreError>;

    /// Atomically replace one stage record iff its status still equals
    /// `expected`. Returns whether the swap happened.
    async fn compare_and_swap_stage(
        &self,
        id: &RequestId,
        stage: Stage,
        expected: StageStatus,
        record: StageRecord,
    ) -> Result<bool, StoreError>;

    /// Record a notification outcome on a stage. Only applies while the
    /// stage's notification is still `NotSent`; later calls are no-ops,
    /// keeping the `NotSent -> Sent|Failed` transition one-shot.
    async fn record_notification(
        &self,
        id: &RequestId,
        stage: Stage,
        outcome: NotificationOutcome,
    ) -> Result<(), StoreError>;

    /// Write the legacy-mapped statuses into the per-stage columns of a row
    /// that never had them. Idempotent: concurrent callers write the same
    /// mapping. Actor fields stay empty, the legacy column stays for audit.
    async fn materialize_legacy_stages(
        &self,
        id: &RequestId,
        stages: &StageRecordSet,
    ) -> Result<(), StoreError>;

    /// Requests holding at least one cleared, non-final stage whose
    /// follow-up notification is still `NotSent`. Lets a sweep re-drive
    /// intents that were committed but never delivered (process restart,
    /// queue overflow).
    async fn find_unnotified(&self) -> Result<Vec<AccessRequest>, StoreError>;
}

/// Role directory. `find_approver` is parameterized by stage because the
/// divisional stage resolves per department while later stages are
/// organization-wide; the caller never special-cases that.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApproverDirectory: Send + Sync {
    async fn find_approver(
        &self,
        stage: Stage,
        department: &DepartmentId,
    ) -> Result<Option<Approver>, DirectoryError>;
}

/// Message delivery (SMS in production, protocol-agnostic here).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, contact: &str, message: &str) -> Result<DeliveryReceipt, ChannelError>;
}
