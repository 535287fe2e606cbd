use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::common::placeholders;
use crate::{
    db::{
        error::DbResult,
        repos::{PhotoRepo, check_batch_size},
    },
    models::Photo,
};

pub struct SqlitePhotoRepo {
    pool: SqlitePool,
}

impl SqlitePhotoRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a photo row, for seeding and tests.
    pub async fn insert(&self, photo: &Photo) -> DbResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO photos (id, event_id, blob_name, uploaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&photo.id)
        .bind(&photo.event_id)
        .bind(&photo.blob_name)
        .bind(photo.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PhotoRepo for SqlitePhotoRepo {
    async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Photo>> {
        let rows = sqlx::query(
            "SELECT id, event_id, blob_name, uploaded_at FROM photos WHERE event_id = ?",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Photo {
                id: row.get("id"),
                event_id: row.get("event_id"),
                blob_name: row.get("blob_name"),
                uploaded_at: row.get("uploaded_at"),
            })
            .collect())
    }

    async fn batch_delete(&self, ids: &[String]) -> DbResult<()> {
        check_batch_size(ids.len())?;
        if ids.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "DELETE FROM photos WHERE id IN ({})",
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
