// The approval workflow engine: stage catalog, data model, legacy status
// mapping, status projection, transition guard and the orchestrating service.

pub mod error;
pub mod guard;
pub mod legacy;
pub mod projector;
pub mod record;
pub mod service;
pub mod stage;

pub use error::{Decision, WorkflowError};
pub use guard::{DecisionCommand, TransitionGuard};
pub use projector::{project, DerivedStatus};
pub use record::{
    AccessRequest, Actor, DepartmentId, NotificationStatus, RequestId, StageRecord,
    StageRecordSet, StageStatus,
};
pub use service::{NewAccessRequest, WorkflowService};
pub use stage::{Role, Stage};
