use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::common::placeholders;
use crate::{
    db::{
        error::DbResult,
        repos::{SessionRepo, check_batch_size},
    },
    models::Session,
};

pub struct SqliteSessionRepo {
    pool: SqlitePool,
}

impl SqliteSessionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a session row, for seeding and tests.
    pub async fn insert(&self, session: &Session) -> DbResult<()> {
        sqlx::query("INSERT OR REPLACE INTO sessions (id, event_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(&session.event_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for SqliteSessionRepo {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Session>> {
        let rows = sqlx::query("SELECT id, event_id, expires_at FROM sessions WHERE event_id = ?")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Session {
                id: row.get("id"),
                event_id: row.get("event_id"),
                expires_at: row.get("expires_at"),
            })
            .collect())
    }

    async fn batch_delete(&self, ids: &[String]) -> DbResult<()> {
        check_batch_size(ids.len())?;
        if ids.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "DELETE FROM sessions WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }
}
