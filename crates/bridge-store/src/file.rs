//! Flat durable file backend.
//!
//! Persists the whole store (subscriber list plus stats row) as one
//! pretty-printed JSON document. Every mutation happens under a single
//! async mutex and is flushed with a write-to-temp-then-rename, so a crash
//! mid-write leaves the previous document intact.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};

use bridge_core::{
    error::{BridgeError, Result},
    models::{DeliveryStats, Subscriber, SubscriberId},
};

use crate::{new_subscriber, StatsUpdate, SubscriberStore};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileState {
    subscribers: Vec<Subscriber>,
    stats: DeliveryStats,
}

/// Flat-file subscriber store.
///
/// The mutex is the backend's internal serialization: one writer at a
/// time, and every write persists the full document before releasing the
/// lock, which gives read-your-writes for free.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Opens the store at `path`, loading the existing document if present.
    ///
    /// Parent directories are created as needed; a missing file starts the
    /// store empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BridgeError::store(format!("create {}: {e}", parent.display())))?;
            }
        }

        let state = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| BridgeError::store(format!("parse {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileState::default(),
            Err(e) => {
                return Err(BridgeError::store(format!("read {}: {e}", path.display())));
            },
        };

        Ok(Self { path, state: Mutex::new(state) })
    }

    /// Writes the document to a sibling temp file, then renames over the
    /// real path. Called with the state lock held.
    async fn persist(&self, state: &FileState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| BridgeError::store(format!("serialize store: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| BridgeError::store(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| BridgeError::store(format!("rename {}: {e}", self.path.display())))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriberStore for FileStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.state.lock().await.subscribers.clone())
    }

    async fn create_subscriber(&self, url: &str, events: Vec<String>) -> Result<Subscriber> {
        let subscriber = new_subscriber(url, events)?;

        let mut state = self.state.lock().await;
        state.subscribers.push(subscriber.clone());
        self.persist(&state).await?;

        Ok(subscriber)
    }

    async fn find_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>> {
        let state = self.state.lock().await;
        Ok(state.subscribers.iter().find(|s| s.id == id).cloned())
    }

    async fn set_enabled(&self, id: SubscriberId, enabled: bool) -> Result<Option<Subscriber>> {
        let mut state = self.state.lock().await;

        let Some(subscriber) = state.subscribers.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        subscriber.enabled = enabled;
        subscriber.updated_at = Utc::now();
        let updated = subscriber.clone();

        self.persist(&state).await?;
        Ok(Some(updated))
    }

    async fn delete_subscriber(&self, id: SubscriberId) -> Result<bool> {
        let mut state = self.state.lock().await;

        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        let removed = state.subscribers.len() != before;

        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn update_delivery_result(
        &self,
        id: SubscriberId,
        ok: bool,
        error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        let Some(subscriber) = state.subscribers.iter_mut().find(|s| s.id == id) else {
            // Subscriber deleted while its delivery sequence was in flight.
            return Ok(());
        };

        let now = Utc::now();
        if ok {
            subscriber.last_success_at = Some(now);
            subscriber.last_error = None;
        } else {
            subscriber.last_error = error.map(ToString::to_string);
        }
        subscriber.updated_at = now;

        self.persist(&state).await
    }

    async fn stats(&self) -> Result<DeliveryStats> {
        Ok(self.state.lock().await.stats.clone())
    }

    async fn apply_stats(&self, update: StatsUpdate) -> Result<()> {
        let mut state = self.state.lock().await;
        update.apply_to(&mut state.stats, Utc::now());
        self.persist(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");

        let created = {
            let store = FileStore::open(&path).await.unwrap();
            store
                .create_subscriber("https://example.com/hook", vec!["integration_*".to_string()])
                .await
                .unwrap()
        };

        let reopened = FileStore::open(&path).await.unwrap();
        let found = reopened.find_subscriber(created.id).await.unwrap().unwrap();

        assert_eq!(found.url, "https://example.com/hook");
        assert_eq!(found.secret, created.secret);
        assert_eq!(found.events, vec!["integration_*".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");
        fs::write(&path, b"{not json").await.unwrap();

        let result = FileStore::open(&path).await;
        assert!(matches!(result, Err(BridgeError::Store { .. })));
    }

    #[tokio::test]
    async fn temp_file_does_not_linger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");

        let store = FileStore::open(&path).await.unwrap();
        store.create_subscriber("https://example.com/hook", Vec::new()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
