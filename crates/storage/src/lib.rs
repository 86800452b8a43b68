use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};
use tracing::debug;

use shared::domain::SessionRecord;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/sessions.db";

/// Advisory accumulation of completed sessions, kept for later bulk export.
/// Never the authoritative copy of a participant's data.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, record: &SessionRecord) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<SessionRecord>>;
    /// Removes every stored session and reports how many were dropped.
    async fn clear(&self) -> Result<u64>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: i64,
    pub record: SessionRecord,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every pooled connection to an in-memory url would get its own database
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_session(&self, record: &SessionRecord) -> Result<i64> {
        let record_json =
            serde_json::to_string(record).context("failed to encode session record")?;
        let rec = sqlx::query(
            "INSERT INTO sessions (participant_id, condition, record_json) VALUES (?, ?, ?)
             RETURNING id",
        )
        .bind(&record.participant_id)
        .bind(record.condition.as_str())
        .bind(record_json)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn list_sessions(&self) -> Result<Vec<StoredSession>> {
        let rows = sqlx::query(
            "SELECT id, record_json, created_at FROM sessions ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id = row.get::<i64, _>("id");
                let record_json = row.get::<String, _>("record_json");
                let record = serde_json::from_str(&record_json)
                    .with_context(|| format!("session row {id} holds an unreadable record"))?;
                Ok(StoredSession {
                    id,
                    record,
                    created_at: parse_sqlite_timestamp(&row.get::<String, _>("created_at"))?,
                })
            })
            .collect()
    }

    pub async fn count_sessions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_all_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn append(&self, record: &SessionRecord) -> Result<()> {
        let id = self.insert_session(record).await?;
        debug!(session_row = id, condition = %record.condition, "session appended");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>> {
        Ok(self
            .list_sessions()
            .await?
            .into_iter()
            .map(|stored| stored.record)
            .collect())
    }

    async fn clear(&self) -> Result<u64> {
        self.delete_all_sessions().await
    }
}

/// In-process store for tests and for runs without a database.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append(&self, record: &SessionRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SessionRecord>> {
        Ok(self
            .records
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?
            .clone())
    }

    async fn clear(&self) -> Result<u64> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}

/// Turns a bare path or a loosely written sqlite url into one `sqlx` accepts,
/// and creates the parent directory of file-backed databases.
pub fn prepare_database_url(raw_database_url: &str) -> Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

fn parse_sqlite_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .with_context(|| format!("invalid sqlite timestamp '{raw}'"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
