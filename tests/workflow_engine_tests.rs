//! End-to-end workflow tests covering the decision chain, the derived
//! status at every step, and the guard's precondition ordering.

use std::sync::Arc;

use accessflow::{
    Decision, InMemoryRequestStore, RequestStore, Role, Stage, StageStatus, WorkflowError,
    WorkflowService,
};

mod fixtures;
use fixtures::{approval_chain, decide_cmd, fake_directory, radiology_request};

fn service(store: Arc<InMemoryRequestStore>) -> WorkflowService {
    fixtures::init_tracing();
    WorkflowService::new(store, fake_directory())
}

#[tokio::test]
async fn happy_path_walks_all_five_stages_to_implemented() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = service(store.clone());
    let request = service.submit(radiology_request()).await.unwrap();

    let expected = [
        ("pending_divisional", 20, Some(Stage::Divisional)),
        ("pending_ict_director", 40, Some(Stage::IctDirector)),
        ("pending_head_it", 60, Some(Stage::HeadIt)),
        ("pending_ict_officer", 80, Some(Stage::IctOfficer)),
        ("implemented", 100, None),
    ];

    for ((stage, actor_id, role, decision), (overall, progress, next)) in
        approval_chain().into_iter().zip(expected)
    {
        let derived = service
            .decide(&decide_cmd(request.id, stage, actor_id, role, decision))
            .await
            .unwrap();
        assert_eq!(derived.overall, overall);
        assert_eq!(derived.progress_percent, progress);
        assert_eq!(derived.next_stage, next);
    }

    let final_status = service.derived_status(&request.id).await.unwrap();
    assert!(final_status.is_complete);
    assert!(!final_status.is_rejected);

    // The winner's data is what got persisted.
    let stored = store.load_request(&request.id).await.unwrap().unwrap();
    assert_eq!(
        stored.stages.get(Stage::IctOfficer).actor_id.as_deref(),
        Some("officer-1")
    );
    assert_eq!(
        stored.stages.status(Stage::IctOfficer),
        StageStatus::Implemented
    );
}

#[tokio::test]
async fn rejection_midway_halts_and_later_decisions_are_out_of_order() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = service(store);
    let request = service.submit(radiology_request()).await.unwrap();

    let derived = service
        .decide(&decide_cmd(
            request.id,
            Stage::Hod,
            "hod-1",
            Role::HeadOfDepartment,
            Decision::Approve,
        ))
        .await
        .unwrap();
    assert_eq!(derived.overall, "pending_divisional");
    assert_eq!(derived.progress_percent, 20);

    let derived = service
        .decide(&decide_cmd(
            request.id,
            Stage::Divisional,
            "dir-radiology",
            Role::DivisionalDirector,
            Decision::Reject,
        ))
        .await
        .unwrap();
    assert_eq!(derived.overall, "divisional_rejected");
    assert!(derived.is_rejected);
    assert!(!derived.is_complete);
    assert_eq!(derived.next_stage, None);

    let err = service
        .decide(&decide_cmd(
            request.id,
            Stage::IctDirector,
            "ictdir-1",
            Role::IctDirector,
            Decision::Approve,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::OutOfOrder {
            stage: Stage::IctDirector,
            waiting_on: Stage::Divisional,
        }
    ));
}

#[tokio::test]
async fn divisional_director_of_another_department_is_unauthorized() {
    let store = Arc::new(InMemoryRequestStore::new());
    let directory = Arc::new(
        fixtures::FakeDirectory::new()
            .with_divisional_director("radiology", "dir-radiology")
            .with_divisional_director("surgery", "dir-surgery"),
    );
    let service = WorkflowService::new(store, directory);
    let request = service.submit(radiology_request()).await.unwrap();

    service
        .decide(&decide_cmd(
            request.id,
            Stage::Hod,
            "hod-1",
            Role::HeadOfDepartment,
            Decision::Approve,
        ))
        .await
        .unwrap();

    // Generically holding the role is not enough.
    let err = service
        .decide(&decide_cmd(
            request.id,
            Stage::Divisional,
            "dir-surgery",
            Role::DivisionalDirector,
            Decision::Approve,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
}

#[tokio::test]
async fn implement_before_the_final_stage_is_invalid() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = service(store);
    let request = service.submit(radiology_request()).await.unwrap();

    let err = service
        .decide(&decide_cmd(
            request.id,
            Stage::Hod,
            "hod-1",
            Role::HeadOfDepartment,
            Decision::Implement,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidDecision {
            stage: Stage::Hod,
            decision: Decision::Implement,
        }
    ));
}

#[tokio::test]
async fn a_decided_stage_is_never_reopened() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = service(store);
    let request = service.submit(radiology_request()).await.unwrap();

    service
        .decide(&decide_cmd(
            request.id,
            Stage::Hod,
            "hod-1",
            Role::HeadOfDepartment,
            Decision::Approve,
        ))
        .await
        .unwrap();

    let err = service
        .decide(&decide_cmd(
            request.id,
            Stage::Hod,
            "hod-2",
            Role::HeadOfDepartment,
            Decision::Reject,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::AlreadyDecided {
            stage: Stage::Hod,
            status: StageStatus::Approved,
        }
    ));
}
