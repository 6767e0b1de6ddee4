//! Legacy single-status rows: reading through the migration mapping, the
//! round-trip property for every known legacy value, and upgrade-on-write
//! when a decision lands on a legacy row.

use std::sync::Arc;

use accessflow::workflow::legacy;
use accessflow::{
    AccessRequest, Decision, DepartmentId, InMemoryRequestStore, RequestStore, Role, Stage,
    StageStatus, WorkflowService,
};

mod fixtures;
use fixtures::{decide_cmd, fake_directory};

fn legacy_request(status: &str) -> AccessRequest {
    let mut request = AccessRequest::new(
        DepartmentId::new("radiology"),
        "Legacy Requester",
        "+255700000099",
        "clinical module access",
    );
    request.legacy_status = Some(status.to_string());
    request
}

#[tokio::test]
async fn every_known_legacy_value_projects_to_a_consistent_state() {
    let expectations = [
        ("pending", "pending_hod", 0),
        ("hod_approved", "pending_divisional", 20),
        ("hod_rejected", "hod_rejected", 0),
        ("divisional_approved", "pending_ict_director", 40),
        ("divisional_rejected", "divisional_rejected", 20),
        ("ict_director_approved", "pending_head_it", 60),
        ("ict_director_rejected", "ict_director_rejected", 40),
        ("head_it_approved", "pending_ict_officer", 80),
        ("head_it_rejected", "head_it_rejected", 60),
        ("ict_officer_approved", "approved", 100),
        ("ict_officer_rejected", "ict_officer_rejected", 80),
        ("approved", "approved", 100),
        ("implemented", "implemented", 100),
    ];

    let store = Arc::new(InMemoryRequestStore::new());
    let service = WorkflowService::new(store.clone(), fake_directory());

    for (legacy_value, expected_overall, expected_progress) in expectations {
        let request = legacy_request(legacy_value);
        let id = request.id;
        store.seed(request);

        let derived = service.derived_status(&id).await.unwrap();
        assert_eq!(
            derived.overall, expected_overall,
            "legacy value {legacy_value:?}"
        );
        assert_eq!(
            derived.progress_percent, expected_progress,
            "legacy value {legacy_value:?}"
        );
    }
}

#[tokio::test]
async fn known_enumeration_is_covered_by_the_round_trip_table() {
    // Guards the test table above against drifting from the adapter.
    assert_eq!(legacy::known_legacy_values().len(), 13);
}

#[tokio::test]
async fn unknown_legacy_value_reads_as_not_yet_started() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = WorkflowService::new(store.clone(), fake_directory());

    let request = legacy_request("awaiting director signature");
    let id = request.id;
    store.seed(request);

    let derived = service.derived_status(&id).await.unwrap();
    assert_eq!(derived.overall, "pending_hod");
    assert_eq!(derived.progress_percent, 0);
    assert!(!derived.is_rejected);
}

#[tokio::test]
async fn deciding_on_a_legacy_row_materializes_the_mapped_columns() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = WorkflowService::new(store.clone(), fake_directory());

    let request = legacy_request("divisional_approved");
    let id = request.id;
    store.seed(request);

    let derived = service
        .decide(&decide_cmd(
            id,
            Stage::IctDirector,
            "ictdir-1",
            Role::IctDirector,
            Decision::Approve,
        ))
        .await
        .unwrap();
    assert_eq!(derived.overall, "pending_head_it");
    assert_eq!(derived.progress_percent, 60);

    let stored = store.load_request(&id).await.unwrap().unwrap();
    assert!(!stored.is_legacy());
    assert_eq!(stored.stages.status(Stage::Hod), StageStatus::Approved);
    assert_eq!(stored.stages.status(Stage::Divisional), StageStatus::Approved);
    assert_eq!(stored.stages.status(Stage::IctDirector), StageStatus::Approved);
    // The legacy column stays for audit.
    assert_eq!(stored.legacy_status.as_deref(), Some("divisional_approved"));
}

#[tokio::test]
async fn legacy_rejection_still_blocks_later_decisions() {
    let store = Arc::new(InMemoryRequestStore::new());
    let service = WorkflowService::new(store.clone(), fake_directory());

    let request = legacy_request("divisional_rejected");
    let id = request.id;
    store.seed(request);

    let err = service
        .decide(&decide_cmd(
            id,
            Stage::IctDirector,
            "ictdir-1",
            Role::IctDirector,
            Decision::Approve,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        accessflow::WorkflowError::OutOfOrder {
            waiting_on: Stage::Divisional,
            ..
        }
    ));
}
