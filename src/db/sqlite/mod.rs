mod common;
mod events;
mod photos;
mod sessions;
mod users;

pub use events::SqliteEventRepo;
pub use photos::SqlitePhotoRepo;
pub use sessions::SqliteSessionRepo;
pub use users::SqliteUserRepo;

#[cfg(test)]
pub(crate) async fn create_test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
