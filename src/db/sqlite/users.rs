use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::UserRepo},
    models::User,
};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a user row, for seeding and tests.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        sqlx::query("INSERT OR REPLACE INTO users (id, email, name) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
        }))
    }
}
