// SQLite-backed request store. One row per request with five per-stage
// column groups plus the legacy free-text status column. Compare-and-swap is
// an UPDATE guarded on the stage's current status column; the WHERE clause
// treats NULL, empty and 'pending' as the same prior state so rows written
// by the old system still swap cleanly.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::store::{NotificationOutcome, RequestStore, StoreError};
use crate::workflow::record::{
    AccessRequest, DepartmentId, NotificationStatus, RequestId, StageRecord, StageRecordSet,
    StageStatus,
};
use crate::workflow::stage::Stage;

pub struct SqliteRequestStore {
    pool: SqlitePool,
}

/// Per-stage column suffixes, in bind order.
const STAGE_FIELDS: [&str; 8] = [
    "status",
    "actor_id",
    "actor_name",
    "decided_at",
    "comment",
    "notification",
    "notification_sent_at",
    "notification_error",
];

impl SqliteRequestStore {
    pub async fn connect(
        url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(url)
            .await
            .map_err(anyhow::Error::from)?
        {
            info!(%url, "creating database");
            Sqlite::create_database(url)
                .await
                .map_err(anyhow::Error::from)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(anyhow::Error::from)?;

        if auto_migrate {
            info!("running database migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(anyhow::Error::from)?;
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(_) => {
            tracing::warn!(value = %raw, "unparseable timestamp column, dropping");
            None
        }
    }
}

fn row_to_request(row: &SqliteRow) -> Result<AccessRequest, StoreError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .with_context(|| format!("corrupt request id {id}"))
        .map_err(StoreError::Backend)?;

    let mut stages = StageRecordSet::new();
    for stage in Stage::ALL {
        let p = stage.name();
        let get_text = |field: &str| -> Option<String> { row.get(format!("{p}_{field}").as_str()) };
        let record = StageRecord {
            status: StageStatus::from_column(get_text("status").as_deref()),
            actor_id: get_text("actor_id"),
            actor_name: get_text("actor_name"),
            decided_at: parse_timestamp(get_text("decided_at")),
            comment: get_text("comment"),
            notification: NotificationStatus::from_column(get_text("notification").as_deref()),
            notification_sent_at: parse_timestamp(get_text("notification_sent_at")),
            notification_error: get_text("notification_error"),
        };
        stages.set(stage, record);
    }

    let submitted_at: Option<String> = row.get("submitted_at");
    Ok(AccessRequest {
        id: RequestId(id),
        department_id: DepartmentId(row.get("department_id")),
        requester_name: row.get("requester_name"),
        requester_contact: row.get("requester_contact"),
        requested_access: row.get("requested_access"),
        submitted_at: parse_timestamp(submitted_at).unwrap_or_else(Utc::now),
        stages,
        legacy_status: row.get("legacy_status"),
    })
}

/// SQL fragment matching "this status column still means pending", covering
/// the old system's three spellings of "no decision yet".
fn pending_predicate(prefix: &str) -> String {
    format!("({prefix}_status IS NULL OR TRIM({prefix}_status) = '' OR {prefix}_status = 'pending')")
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn load_request(&self, id: &RequestId) -> Result<Option<AccessRequest>, StoreError> {
        let row = sqlx::query("SELECT * FROM access_requests WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        row.as_ref().map(row_to_request).transpose()
    }

    async fn insert_request(&self, request: &AccessRequest) -> Result<(), StoreError> {
        let mut columns = vec![
            "id",
            "department_id",
            "requester_name",
            "requester_contact",
            "requested_access",
            "submitted_at",
            "legacy_status",
        ]
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
        for stage in Stage::ALL {
            for field in STAGE_FIELDS {
                columns.push(format!("{}_{field}", stage.name()));
            }
        }
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO access_requests ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(request.id.to_string())
            .bind(request.department_id.0.as_str())
            .bind(request.requester_name.as_str())
            .bind(request.requester_contact.as_str())
            .bind(request.requested_access.as_str())
            .bind(request.submitted_at.to_rfc3339())
            .bind(request.legacy_status.as_deref());
        for stage in Stage::ALL {
            let record = request.stages.get(stage);
            query = query
                .bind(record.status.as_str())
                .bind(record.actor_id.as_deref())
                .bind(record.actor_name.as_deref())
                .bind(record.decided_at.map(|ts| ts.to_rfc3339()))
                .bind(record.comment.as_deref())
                .bind(record.notification.as_str())
                .bind(record.notification_sent_at.map(|ts| ts.to_rfc3339()))
                .bind(record.notification_error.as_deref());
        }
        query
            .execute(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }

    async fn compare_and_swap_stage(
        &self,
        id: &RequestId,
        stage: Stage,
        expected: StageStatus,
        record: StageRecord,
    ) -> Result<bool, StoreError> {
        let p = stage.name();
        let guard = if expected == StageStatus::Pending {
            pending_predicate(p)
        } else {
            format!("{p}_status = ?10")
        };
        let sql = format!(
            "UPDATE access_requests SET \
             {p}_status = ?1, {p}_actor_id = ?2, {p}_actor_name = ?3, \
             {p}_decided_at = ?4, {p}_comment = ?5, {p}_notification = ?6, \
             {p}_notification_sent_at = ?7, {p}_notification_error = ?8 \
             WHERE id = ?9 AND {guard}"
        );
        let mut query = sqlx::query(&sql)
            .bind(record.status.as_str())
            .bind(record.actor_id.as_deref())
            .bind(record.actor_name.as_deref())
            .bind(record.decided_at.map(|ts| ts.to_rfc3339()))
            .bind(record.comment.as_deref())
            .bind(record.notification.as_str())
            .bind(record.notification_sent_at.map(|ts| ts.to_rfc3339()))
            .bind(record.notification_error.as_deref())
            .bind(id.to_string());
        if expected != StageStatus::Pending {
            query = query.bind(expected.as_str());
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_notification(
        &self,
        id: &RequestId,
        stage: Stage,
        outcome: NotificationOutcome,
    ) -> Result<(), StoreError> {
        let p = stage.name();
        let sql = format!(
            "UPDATE access_requests SET \
             {p}_notification = ?1, {p}_notification_sent_at = ?2, {p}_notification_error = ?3 \
             WHERE id = ?4 AND ({p}_notification IS NULL OR {p}_notification = 'not_sent')"
        );
        sqlx::query(&sql)
            .bind(outcome.status.as_str())
            .bind(outcome.sent_at.to_rfc3339())
            .bind(outcome.error.as_deref())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }

    async fn materialize_legacy_stages(
        &self,
        id: &RequestId,
        stages: &StageRecordSet,
    ) -> Result<(), StoreError> {
        let sets = Stage::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}_status = ?{}", s.name(), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let pristine = Stage::ALL
            .iter()
            .map(|s| {
                format!(
                    "{} AND {}_actor_id IS NULL",
                    pending_predicate(s.name()),
                    s.name()
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql =
            format!("UPDATE access_requests SET {sets} WHERE id = ?6 AND {pristine}");
        let mut query = sqlx::query(&sql);
        for stage in Stage::ALL {
            query = query.bind(stages.status(stage).as_str());
        }
        query
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }

    async fn find_unnotified(&self) -> Result<Vec<AccessRequest>, StoreError> {
        let clause = Stage::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| {
                let p = s.name();
                format!(
                    "({p}_status IN ('approved', 'implemented') AND \
                     ({p}_notification IS NULL OR {p}_notification = 'not_sent'))"
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("SELECT * FROM access_requests WHERE {clause}");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        rows.iter().map(row_to_request).collect()
    }
}
