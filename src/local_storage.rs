//! File-backed snapshot storage.
//!
//! Each key maps to one JSON file under the storage directory. Files hold a
//! [`SnapshotEntry`]: the serialized payload plus its SHA-256 checksum, so a
//! truncated or hand-edited snapshot is detected on load and treated as
//! "no cache" instead of surfacing garbage to the stores.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;

use crate::errors::{AppError, ResultExt};

/// Storage key of the property snapshot.
pub const PROPERTIES_KEY: &str = "properties";
/// Storage key of the call log snapshot.
pub const CALLS_KEY: &str = "calls";
/// Storage key of the dashboard settings.
pub const SETTINGS_KEY: &str = "settings";

/// Persisted wrapper around a snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Serialized payload (JSON string)
    pub data: String,
    /// SHA-256 of `data`, hex encoded
    pub checksum: String,
    pub written_at: DateTime<Utc>,
}

impl SnapshotEntry {
    pub fn seal(data: String) -> Self {
        let checksum = checksum_of(&data);
        Self {
            data,
            checksum,
            written_at: Utc::now(),
        }
    }

    pub fn is_intact(&self) -> bool {
        checksum_of(&self.data) == self.checksum
    }

    /// Parses a stored entry and returns its payload if the checksum matches.
    pub fn open(serialized: &[u8]) -> Option<String> {
        let entry: SnapshotEntry = serde_json::from_slice(serialized).ok()?;

        if entry.is_intact() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Snapshot checksum mismatch (expected {}, {} bytes of data)",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}

fn checksum_of(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keyed JSON snapshot store, the persistent side of the optimistic caches.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    /// Opens (and creates if needed) the storage directory.
    pub async fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Creating storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Loads the value stored under `key`.
    ///
    /// Missing files, unreadable files, checksum mismatches and payloads that
    /// do not deserialize into `T` all yield `None`. Never fails.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not read snapshot '{}': {}", key, e);
                return None;
            }
        };

        let Some(data) = SnapshotEntry::open(&bytes) else {
            tracing::warn!("Snapshot '{}' is corrupt, ignoring it", key);
            return None;
        };

        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Snapshot '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Serializes `value` and writes it under `key`, replacing the previous snapshot.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let data = serde_json::to_string(value)?;
        let entry = serde_json::to_vec(&SnapshotEntry::seal(data))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, entry)
            .await
            .with_context(|| format!("Writing snapshot '{}'", key))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Replacing snapshot '{}'", key))?;

        tracing::debug!("Persisted snapshot '{}'", key);
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("estate_storage_{}", Uuid::new_v4()))
    }

    #[test]
    fn test_sealed_entry_is_intact() {
        let entry = SnapshotEntry::seal(r#"[{"id":"p1"}]"#.to_string());
        assert!(entry.is_intact());
    }

    #[test]
    fn test_tampered_entry_rejected() {
        let entry = SnapshotEntry::seal(r#"[{"id":"p1"}]"#.to_string());
        let serialized = serde_json::to_string(&entry).unwrap();
        let tampered = serialized.replace("p1", "p2");
        assert_eq!(SnapshotEntry::open(tampered.as_bytes()), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = temp_dir();
        let storage = LocalStorage::open(&dir).await.unwrap();

        storage.save("numbers", &vec![1, 2, 3]).await.unwrap();
        let loaded: Option<Vec<i32>> = storage.load("numbers").await;
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_missing_and_garbled_read_as_none() {
        let dir = temp_dir();
        let storage = LocalStorage::open(&dir).await.unwrap();

        let missing: Option<Vec<i32>> = storage.load("nothing").await;
        assert!(missing.is_none());

        tokio::fs::write(storage.path_for("garbled"), b"{not json")
            .await
            .unwrap();
        let garbled: Option<Vec<i32>> = storage.load("garbled").await;
        assert!(garbled.is_none());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_wrong_shape_reads_as_none() {
        let dir = temp_dir();
        let storage = LocalStorage::open(&dir).await.unwrap();

        storage.save("shape", &"a string").await.unwrap();
        let loaded: Option<Vec<i32>> = storage.load("shape").await;
        assert!(loaded.is_none());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
