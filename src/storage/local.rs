//! Local filesystem storage implementation.
//!
//! Every file is rewritten wholesale through a temp file and a rename, so a
//! crash mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::WebhookMarker;
use crate::storage::ObservationStore;

const OBSERVATIONS_FILE: &str = "mod_data.json";
const WEBHOOK_FILE: &str = "webhook_data.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the observation store; empty when no file exists yet.
    pub async fn load_observations(&self) -> Result<ObservationStore> {
        match self.read_json(OBSERVATIONS_FILE).await? {
            Some(store) => Ok(store),
            None => {
                log::info!("No previous data found, starting fresh");
                Ok(ObservationStore::default())
            }
        }
    }

    /// Overwrite the observation store file.
    pub async fn save_observations(&self, store: &ObservationStore) -> Result<()> {
        self.write_json(OBSERVATIONS_FILE, store).await
    }

    /// Load the webhook marker; default when no file exists or it is unreadable.
    pub async fn load_webhook_marker(&self) -> WebhookMarker {
        match self.read_json(WEBHOOK_FILE).await {
            Ok(marker) => marker.unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring unreadable {WEBHOOK_FILE}: {e}");
                WebhookMarker::default()
            }
        }
    }

    pub async fn save_webhook_marker(&self, marker: &WebhookMarker) -> Result<()> {
        self.write_json(WEBHOOK_FILE, marker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_store() -> ObservationStore {
        let mut store = ObservationStore::default();
        store.insert(
            "42",
            Observation {
                last_update: 500,
                title: "Foo".to_string(),
                category: "Essential Mods".to_string(),
            },
        );
        store.insert(
            "7",
            Observation {
                last_update: 1_000_000_000,
                title: "Seven".to_string(),
                category: "Graphics Mods".to_string(),
            },
        );
        store
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_store_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load_observations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));
        let store = sample_store();

        storage.save_observations(&store).await.unwrap();
        let loaded = storage.load_observations().await.unwrap();

        assert_eq!(loaded, store);
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.save_observations(&sample_store()).await.unwrap();
        let mut smaller = sample_store();
        smaller.remove("7");
        storage.save_observations(&smaller).await.unwrap();

        let loaded = storage.load_observations().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("7").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_store_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes(OBSERVATIONS_FILE, b"{not json").await.unwrap();

        assert!(matches!(
            storage.load_observations().await,
            Err(AppError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_marker_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert_eq!(storage.load_webhook_marker().await, WebhookMarker::default());

        let mut marker = WebhookMarker::default();
        marker.mark_tested("https://hook.example/a", Utc::now());
        storage.save_webhook_marker(&marker).await.unwrap();

        assert_eq!(storage.load_webhook_marker().await, marker);
    }
}
