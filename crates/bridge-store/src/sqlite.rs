//! SQLite backend.
//!
//! Stores subscribers and the stats row in a local SQLite database. Counter
//! updates are expressed as arithmetic inside the UPDATE statement, so the
//! database serializes concurrent increments without the caller holding any
//! lock. All access goes through a single pooled connection, which is the
//! backend's writer discipline.

use std::{path::Path, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use uuid::Uuid;

use bridge_core::{
    error::{BridgeError, Result},
    models::{DeliveryStats, Subscriber, SubscriberId},
};

use crate::{new_subscriber, StatsUpdate, SubscriberStore};

/// SQLite subscriber store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) a database file and runs the bootstrap
    /// migration.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        Self::connect_with(options).await
    }

    /// Opens an in-memory database, for tests and ephemeral runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(store_error)?
            .busy_timeout(Duration::from_secs(5));
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        // A single long-lived connection is the writer discipline; it also
        // keeps in-memory databases alive for the pool's whole lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(store_error)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Idempotent schema bootstrap.
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS subscribers (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                enabled INTEGER NOT NULL,
                events TEXT NOT NULL,
                secret TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_success_at TEXT,
                last_error TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS bridge_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                delivered INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                retries_scheduled INTEGER NOT NULL DEFAULT 0,
                last_delivery_at TEXT,
                last_event_at TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query("INSERT OR IGNORE INTO bridge_stats (id, updated_at) VALUES (1, ?)")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriberStore for SqliteStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query("SELECT * FROM subscribers ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        rows.iter().map(subscriber_from_row).collect()
    }

    async fn create_subscriber(&self, url: &str, events: Vec<String>) -> Result<Subscriber> {
        let subscriber = new_subscriber(url, events)?;

        let events_json = serde_json::to_string(&subscriber.events)
            .map_err(|e| BridgeError::store(format!("serialize patterns: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO subscribers
                (id, url, enabled, events, secret, created_at, updated_at, last_success_at, last_error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(subscriber.id.to_string())
        .bind(&subscriber.url)
        .bind(subscriber.enabled)
        .bind(events_json)
        .bind(&subscriber.secret)
        .bind(subscriber.created_at)
        .bind(subscriber.updated_at)
        .bind(subscriber.last_success_at)
        .bind(&subscriber.last_error)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(subscriber)
    }

    async fn find_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
        let row = sqlx::query("SELECT * FROM subscribers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    async fn set_enabled(&self, id: SubscriberId, enabled: bool) -> Result<Option<Subscriber>> {
        let result = sqlx::query("UPDATE subscribers SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_subscriber(id).await
    }

    async fn delete_subscriber(&self, id: SubscriberId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_delivery_result(
        &self,
        id: SubscriberId,
        ok: bool,
        error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();

        // rows_affected 0 means the subscriber was deleted mid-flight; the
        // contract makes that a silent no-op.
        if ok {
            sqlx::query(
                "UPDATE subscribers SET last_success_at = ?, last_error = NULL, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        } else {
            sqlx::query("UPDATE subscribers SET last_error = ?, updated_at = ? WHERE id = ?")
                .bind(error)
                .bind(now)
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(store_error)?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<DeliveryStats> {
        let row = sqlx::query("SELECT * FROM bridge_stats WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(DeliveryStats {
            delivered: counter(&row, "delivered")?,
            failed: counter(&row, "failed")?,
            retries_scheduled: counter(&row, "retries_scheduled")?,
            last_delivery_at: row.try_get("last_delivery_at").map_err(store_error)?,
            last_event_at: row.try_get("last_event_at").map_err(store_error)?,
            updated_at: row.try_get("updated_at").map_err(store_error)?,
        })
    }

    async fn apply_stats(&self, update: StatsUpdate) -> Result<()> {
        sqlx::query(
            r"
            UPDATE bridge_stats SET
                delivered = delivered + ?,
                failed = failed + ?,
                retries_scheduled = retries_scheduled + ?,
                last_delivery_at = COALESCE(?, last_delivery_at),
                last_event_at = COALESCE(?, last_event_at),
                updated_at = ?
            WHERE id = 1
            ",
        )
        .bind(to_i64(update.delivered))
        .bind(to_i64(update.failed))
        .bind(to_i64(update.retries_scheduled))
        .bind(update.last_delivery_at)
        .bind(update.last_event_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

fn store_error(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::store(e.to_string())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn counter(row: &SqliteRow, column: &str) -> Result<u64> {
    let value: i64 = row.try_get(column).map_err(store_error)?;
    Ok(u64::try_from(value).unwrap_or(0))
}

fn subscriber_from_row(row: &SqliteRow) -> Result<Subscriber> {
    let id: String = row.try_get("id").map_err(store_error)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| BridgeError::store(format!("malformed subscriber id {id}: {e}")))?;

    let events_json: String = row.try_get("events").map_err(store_error)?;
    let events: Vec<String> = serde_json::from_str(&events_json)
        .map_err(|e| BridgeError::store(format!("malformed pattern list: {e}")))?;

    Ok(Subscriber {
        id: SubscriberId::from(id),
        url: row.try_get("url").map_err(store_error)?,
        enabled: row.try_get("enabled").map_err(store_error)?,
        events,
        secret: row.try_get("secret").map_err(store_error)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(store_error)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(store_error)?,
        last_success_at: row.try_get("last_success_at").map_err(store_error)?,
        last_error: row.try_get("last_error").map_err(store_error)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migration_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.delivered, 0);
    }

    #[tokio::test]
    async fn database_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.db");

        let created = {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .create_subscriber("https://example.com/hook", vec!["integration_*".to_string()])
                .await
                .unwrap()
        };

        let reopened = SqliteStore::open(&path).await.unwrap();
        let found = reopened.find_subscriber(created.id).await.unwrap().unwrap();

        assert_eq!(found.url, created.url);
        assert_eq!(found.secret, created.secret);
        assert_eq!(found.events, created.events);
    }
}
