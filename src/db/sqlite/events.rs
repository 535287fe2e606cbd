use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::{parse_days, parse_status, placeholders};
use crate::{
    db::{
        error::DbResult,
        repos::{EventRepo, check_transition},
    },
    models::{Event, EventStatus},
};

const EVENT_COLUMNS: &str = "id, name, start_date_time, end_date_time, grace_period_days, \
     retention_period_days, status, organizer_id, face_collection_id, updated_at";

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace an event row. The lifecycle jobs never create
    /// events; this exists for seeding and tests.
    pub async fn insert(&self, event: &Event) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO events (
                id, name, start_date_time, end_date_time, grace_period_days,
                retention_period_days, status, organizer_id, face_collection_id, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.start_date_time)
        .bind(event.end_date_time)
        .bind(i64::from(event.grace_period_days))
        .bind(i64::from(event.retention_period_days))
        .bind(event.status.as_str())
        .bind(&event.organizer_id)
        .bind(&event.face_collection_id)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn parse_event(row: &SqliteRow) -> DbResult<Event> {
        let status: String = row.get("status");
        let grace_period_days: i64 = row.get("grace_period_days");
        let retention_period_days: i64 = row.get("retention_period_days");
        Ok(Event {
            id: row.get("id"),
            name: row.get("name"),
            start_date_time: row.get("start_date_time"),
            end_date_time: row.get("end_date_time"),
            grace_period_days: parse_days("grace_period_days", grace_period_days)?,
            retention_period_days: parse_days("retention_period_days", retention_period_days)?,
            status: parse_status(&status)?,
            organizer_id: row.get("organizer_id"),
            face_collection_id: row.get("face_collection_id"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl EventRepo for SqliteEventRepo {
    async fn list_by_status(&self, statuses: &[EventStatus]) -> DbResult<Vec<Event>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status IN ({})",
            placeholders(statuses.len())
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        // A malformed row must not hide every other candidate from the scan.
        Ok(rows
            .iter()
            .filter_map(|row| match Self::parse_event(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    let id: String = row.get("id");
                    tracing::error!(event_id = %id, error = %e, "Skipping malformed event row");
                    None
                }
            })
            .collect())
    }

    async fn get(&self, id: &str) -> DbResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_event).transpose()
    }

    async fn update_status(
        &self,
        id: &str,
        expected: &[EventStatus],
        status: EventStatus,
        updated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(current) = sqlx::query("SELECT status FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(false);
        };
        let current = parse_status(current.get::<&str, _>("status"))?;

        if !check_transition(id, current, expected, status)? {
            return Ok(false);
        }

        // Compare-and-set on the status we just read so an overlapping run
        // that got there first turns this into a no-op.
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(updated_at)
        .bind(id)
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
