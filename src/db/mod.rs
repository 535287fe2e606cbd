mod error;
pub mod memory;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Repository trait objects, created once at startup.
struct CachedRepos {
    events: Arc<dyn EventRepo>,
    sessions: Arc<dyn SessionRepo>,
    photos: Arc<dyn PhotoRepo>,
    users: Arc<dyn UserRepo>,
}

enum PoolStorage {
    Memory,
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
}

/// Handle to the record stores the lifecycle jobs read and prune.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Process-local, empty stores.
    pub fn in_memory() -> Self {
        Self::from_repos(
            Arc::new(memory::MemoryEventRepo::new()),
            Arc::new(memory::MemorySessionRepo::new()),
            Arc::new(memory::MemoryPhotoRepo::new()),
            Arc::new(memory::MemoryUserRepo::new()),
        )
    }

    /// Wrap already-constructed repositories, e.g. seeded in-memory stores or
    /// fault-injecting wrappers in tests.
    pub fn from_repos(
        events: Arc<dyn EventRepo>,
        sessions: Arc<dyn SessionRepo>,
        photos: Arc<dyn PhotoRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        DbPool {
            inner: PoolStorage::Memory,
            repos: CachedRepos {
                events,
                sessions,
                photos,
                users,
            },
        }
    }

    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            events: Arc::new(sqlite::SqliteEventRepo::new(pool.clone())),
            sessions: Arc::new(sqlite::SqliteSessionRepo::new(pool.clone())),
            photos: Arc::new(sqlite::SqlitePhotoRepo::new(pool.clone())),
            users: Arc::new(sqlite::SqliteUserRepo::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::Memory => {
                tracing::warn!(
                    "Using in-memory record stores; nothing is read from or written to a database"
                );
                Ok(Self::in_memory())
            }
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                let db = Self::from_sqlite(pool);
                if cfg.run_migrations {
                    db.run_migrations().await?;
                }
                Ok(db)
            }
        }
    }

    /// Run database migrations using sqlx's migration runner.
    /// A no-op for in-memory stores.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            PoolStorage::Memory => Ok(()),
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
        }
    }

    /// Backend name for logging.
    pub fn backend_name(&self) -> &'static str {
        match &self.inner {
            PoolStorage::Memory => "memory",
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(_) => "sqlite",
        }
    }

    pub fn events(&self) -> Arc<dyn EventRepo> {
        Arc::clone(&self.repos.events)
    }

    pub fn sessions(&self) -> Arc<dyn SessionRepo> {
        Arc::clone(&self.repos.sessions)
    }

    pub fn photos(&self) -> Arc<dyn PhotoRepo> {
        Arc::clone(&self.repos.photos)
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        Arc::clone(&self.repos.users)
    }
}
