// Accessflow - sequential multi-stage approval workflow engine for hospital
// IT access requests. This exposes the engine's public surface for the HTTP
// layer and for tests.

pub mod config;
pub mod notify;
pub mod observability;
pub mod store;
pub mod workflow;

// Re-export key types for easy access
pub use config::{AccessflowConfig, DatabaseConfig, NotificationConfig};
pub use notify::{
    intent_queue, NotificationDispatcher, NotificationIntent, NotificationWorker, RetryConfig,
};
pub use observability::init_tracing;
pub use store::memory::InMemoryRequestStore;
pub use store::{
    Approver, ApproverDirectory, ChannelError, DeliveryReceipt, DirectoryError,
    NotificationChannel, NotificationOutcome, RequestStore, StoreError,
};
pub use workflow::{
    AccessRequest, Actor, Decision, DecisionCommand, DepartmentId, DerivedStatus,
    NewAccessRequest, NotificationStatus, RequestId, Role, Stage, StageRecord, StageRecordSet,
    StageStatus, TransitionGuard, WorkflowError, WorkflowService,
};

#[cfg(feature = "database")]
pub use store::sqlite::SqliteRequestStore;
