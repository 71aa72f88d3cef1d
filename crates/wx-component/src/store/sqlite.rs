use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use super::CredentialStore;
use crate::error::Result;

/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_POOL_SIZE: u32 = 4;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS credential_cache (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL
)
"#;

/// Current time as Unix epoch milliseconds (UTC).
#[inline]
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Credential store persisted in a SQLite table.
///
/// Expiry is stored as absolute epoch milliseconds, so every process opening the
/// same database file sees the same entries with the same deadlines.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: Pool<Sqlite>,
}

impl SqliteCredentialStore {
    /// Open (creating if needed) the database at `database_url`,
    /// e.g. `sqlite:wxc.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_POOL_SIZE)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(connect_options)
            .await?;

        let store = Self::from_pool(pool).await?;
        info!("Credential store opened at {}", database_url);
        Ok(store)
    }

    /// Use an existing pool. The cache table is created if missing.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Delete expired rows. Returns the number removed.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM credential_cache WHERE expires_at <= ?")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected();
        if removed > 0 {
            debug!("Removed {} expired credential cache rows", removed);
        }
        Ok(removed)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_ms().saturating_add(ttl_ms);

        sqlx::query(
            r#"
            INSERT INTO credential_cache (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM credential_cache WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(now_ms())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM credential_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteCredentialStore {
        // A single connection keeps the in-memory database alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteCredentialStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let store = memory_store().await;
        store.set("k", "v1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        store.set("k", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_expired_rows_are_absent() {
        let store = memory_store().await;
        store.set("k", "v", Duration::ZERO).await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = memory_store().await;
        store.set("k", "v", Duration::from_secs(60)).await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
