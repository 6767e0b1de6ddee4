// Shared test fixtures: hand-rolled collaborator fakes and request builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use once_cell::sync::Lazy;

use accessflow::{
    Actor, Approver, ApproverDirectory, ChannelError, Decision, DecisionCommand, DeliveryReceipt,
    DepartmentId, DirectoryError, NewAccessRequest, NotificationChannel, RequestId, Role, Stage,
};

static TRACING: Lazy<()> = Lazy::new(|| accessflow::init_tracing("warn"));

/// Initialize tracing once per test binary.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Directory fake: org-wide approvers for every stage, plus per-department
/// divisional directors.
#[derive(Debug, Default, Clone)]
pub struct FakeDirectory {
    divisional: HashMap<String, Approver>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_divisional_director(mut self, department: &str, user_id: &str) -> Self {
        self.divisional.insert(
            department.to_string(),
            Approver {
                user_id: user_id.to_string(),
                display_name: format!("Divisional Director ({department})"),
                contact: format!("+2557001{:05}", self.divisional.len()),
            },
        );
        self
    }
}

#[async_trait]
impl ApproverDirectory for FakeDirectory {
    async fn find_approver(
        &self,
        stage: Stage,
        department: &DepartmentId,
    ) -> Result<Option<Approver>, DirectoryError> {
        if stage == Stage::Divisional {
            return Ok(self.divisional.get(&department.0).cloned());
        }
        Ok(Some(Approver {
            user_id: format!("{stage}-approver"),
            display_name: stage.title().to_string(),
            contact: format!("+255700{}", stage.index()),
        }))
    }
}

/// Channel fake recording every send; can be told to fail the first N calls.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    fail_first: AtomicU32,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(n: u32) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_first: AtomicU32::new(n),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, contact: &str, message: &str) -> Result<DeliveryReceipt, ChannelError> {
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(ChannelError::Transport("simulated outage".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((contact.to_string(), message.to_string()));
        Ok(DeliveryReceipt {
            delivered: true,
            provider_ref: Some(format!("ref-{}", sent.len())),
        })
    }
}

pub fn radiology_request() -> NewAccessRequest {
    NewAccessRequest {
        department_id: DepartmentId::new("radiology"),
        requester_name: "A. Mwangi".to_string(),
        requester_contact: "+255700000001".to_string(),
        requested_access: "PACS viewer access".to_string(),
    }
}

pub fn actor(id: &str, role: Role) -> Actor {
    Actor {
        id: id.to_string(),
        name: format!("user {id}"),
        role,
    }
}

pub fn decide_cmd(
    request_id: RequestId,
    stage: Stage,
    actor_id: &str,
    role: Role,
    decision: Decision,
) -> DecisionCommand {
    DecisionCommand {
        request_id,
        stage,
        actor: actor(actor_id, role),
        decision,
        comment: None,
    }
}

/// The full approval chain for the radiology fixture, in order.
pub fn approval_chain() -> [(Stage, &'static str, Role, Decision); 5] {
    [
        (Stage::Hod, "hod-1", Role::HeadOfDepartment, Decision::Approve),
        (
            Stage::Divisional,
            "dir-radiology",
            Role::DivisionalDirector,
            Decision::Approve,
        ),
        (
            Stage::IctDirector,
            "ictdir-1",
            Role::IctDirector,
            Decision::Approve,
        ),
        (Stage::HeadIt, "headit-1", Role::HeadOfIt, Decision::Approve),
        (
            Stage::IctOfficer,
            "officer-1",
            Role::IctOfficer,
            Decision::Implement,
        ),
    ]
}

pub fn fake_directory() -> Arc<FakeDirectory> {
    Arc::new(FakeDirectory::new().with_divisional_director("radiology", "dir-radiology"))
}
