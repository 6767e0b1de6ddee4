// In-memory store with the same compare-and-swap semantics as the SQL
// implementation. Used by tests and as the reference for CAS behavior.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::{NotificationOutcome, RequestStore, StoreError};
use crate::workflow::record::{
    AccessRequest, NotificationStatus, RequestId, StageRecord, StageRecordSet, StageStatus,
};
use crate::workflow::stage::Stage;

#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: Mutex<HashMap<RequestId, AccessRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a request directly, bypassing the workflow. Test helper.
    pub fn seed(&self, request: AccessRequest) {
        self.requests.lock().unwrap().insert(request.id, request);
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn load_request(&self, id: &RequestId) -> Result<Option<AccessRequest>, StoreError> {
        Ok(self.requests.lock().unwrap().get(id).cloned())
    }

    async fn insert_request(&self, request: &AccessRequest) -> Result<(), StoreError> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn compare_and_swap_stage(
        &self,
        id: &RequestId,
        stage: Stage,
        expected: StageStatus,
        record: StageRecord,
    ) -> Result<bool, StoreError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(request) = requests.get_mut(id) else {
            return Ok(false);
        };
        if request.stages.status(stage) != expected {
            return Ok(false);
        }
        request.stages.set(stage, record);
        Ok(true)
    }

    async fn record_notification(
        &self,
        id: &RequestId,
        stage: Stage,
        outcome: NotificationOutcome,
    ) -> Result<(), StoreError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(request) = requests.get_mut(id) else {
            return Ok(());
        };
        let record = request.stages.get_mut(stage);
        if record.notification != NotificationStatus::NotSent {
            return Ok(());
        }
        record.notification = outcome.status;
        record.notification_sent_at = Some(outcome.sent_at);
        record.notification_error = outcome.error;
        Ok(())
    }

    async fn materialize_legacy_stages(
        &self,
        id: &RequestId,
        stages: &StageRecordSet,
    ) -> Result<(), StoreError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(request) = requests.get_mut(id) else {
            return Ok(());
        };
        if request.stages.is_pristine() {
            request.stages = stages.clone();
        }
        Ok(())
    }

    async fn find_unnotified(&self) -> Result<Vec<AccessRequest>, StoreError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .filter(|request| {
                request.stages.iter().any(|(stage, record)| {
                    !stage.is_terminal()
                        && record.status.is_cleared()
                        && record.notification == NotificationStatus::NotSent
                })
            })
            .cloned()
            .collect())
    }
}
