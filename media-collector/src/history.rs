//! History ledger: which videos have already been collected.
//!
//! A row is written only after both tracks were downloaded and merged, so an
//! interrupted run never marks an incomplete item as done.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::Result;

/// Database connection pool type alias.
pub type DbPool = Pool<Sqlite>;

/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Separator used when a tag list is flattened into the `tags` column.
pub const TAG_SEPARATOR: &str = ";";

/// Open the ledger database.
///
/// A single connection serializes all access, which also keeps
/// `sqlite::memory:` databases alive for the lifetime of the pool.
pub async fn init_pool(database_url: &str) -> std::result::Result<DbPool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(60))
        .connect_with(connect_options)
        .await?;

    tracing::debug!(url = database_url, "History database opened");
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    tracing::debug!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One collected video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryRecord {
    pub bvid: String,
    pub author: String,
    pub title: String,
    pub keyword: String,
    pub tags: String,
    pub file_name: String,
}

/// History repository trait.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// `false` when no row exists; other storage errors propagate.
    async fn is_acquired(&self, bvid: &str) -> Result<bool>;
    /// Insert, or fully overwrite the row with the same `bvid`.
    async fn record(&self, record: &HistoryRecord) -> Result<()>;
    async fn list(&self) -> Result<Vec<HistoryRecord>>;
}

/// SQLx implementation of HistoryRepository.
pub struct SqlxHistoryRepository {
    pool: SqlitePool,
}

impl SqlxHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open `database_url`, apply migrations and wrap the pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = init_pool(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl HistoryRepository for SqlxHistoryRepository {
    async fn is_acquired(&self, bvid: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT bvid FROM history WHERE bvid = ?")
            .bind(bvid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn record(&self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (bvid, author, title, keyword, tags, file_name)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(bvid) DO UPDATE SET
                author = excluded.author,
                title = excluded.title,
                keyword = excluded.keyword,
                tags = excluded.tags,
                file_name = excluded.file_name
            "#,
        )
        .bind(&record.bvid)
        .bind(&record.author)
        .bind(&record.title)
        .bind(&record.keyword)
        .bind(&record.tags)
        .bind(&record.file_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRecord>(
            "SELECT bvid, author, title, keyword, tags, file_name FROM history ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
