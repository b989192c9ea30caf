//! Metadata Store Module
//!
//! Durable per-cache timestamp indexes used for expiration decisions.
//!
//! Stores do not serialize access themselves: every mutation runs inside a
//! task on the cleanup queue, which orders them.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::TimestampIndex;
use crate::error::{FetchCacheError, Result};

// == Metadata Store ==
/// Opens timestamp indexes by cache name.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Opens the index for `cache_name`, creating an empty one if needed.
    /// Opening the same name twice yields the same index.
    async fn open(&self, cache_name: &str) -> Result<Arc<dyn MetadataIndex>>;
}

/// Timestamp index for one cache.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Upserts the last-write time for `url`.
    async fn set_timestamp(&self, url: &str, timestamp_ms: i64) -> Result<()>;

    /// Returns a copy of the whole index.
    async fn snapshot(&self) -> Result<TimestampIndex>;

    /// Removes `urls`. Missing keys are not an error.
    async fn delete_keys(&self, urls: &[String]) -> Result<()>;
}

// == Memory Metadata Store ==
/// Non-durable store, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    indexes: Mutex<HashMap<String, Arc<MemoryIndex>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn open(&self, cache_name: &str) -> Result<Arc<dyn MetadataIndex>> {
        let mut indexes = self.indexes.lock().await;
        let index = indexes
            .entry(cache_name.to_string())
            .or_insert_with(|| Arc::new(MemoryIndex::default()))
            .clone();
        Ok(index)
    }
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    index: Mutex<TimestampIndex>,
}

#[async_trait]
impl MetadataIndex for MemoryIndex {
    async fn set_timestamp(&self, url: &str, timestamp_ms: i64) -> Result<()> {
        self.index.lock().await.upsert(url, timestamp_ms);
        Ok(())
    }

    async fn snapshot(&self) -> Result<TimestampIndex> {
        Ok(self.index.lock().await.clone())
    }

    async fn delete_keys(&self, urls: &[String]) -> Result<()> {
        self.index.lock().await.remove_keys(urls);
        Ok(())
    }
}

// == File Metadata Store ==
/// Store that keeps one JSON file per cache under `dir`.
///
/// Every mutation is written through to disk by writing a temporary file
/// and renaming it over the index file.
#[derive(Debug)]
pub struct FileMetadataStore {
    dir: PathBuf,
    indexes: Mutex<HashMap<String, Arc<FileIndex>>>,
}

impl FileMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// Ensures the index directory exists.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| metadata_io("create index directory", &self.dir, e))?;
        info!(dir = ?self.dir, "Metadata store initialized");
        Ok(())
    }

    /// Index file for `cache_name`, named by the hex SHA-256 of the name so
    /// any string maps to a short, safe file name.
    pub fn index_path(&self, cache_name: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(cache_name.as_bytes());
        self.dir
            .join(format!("{}.json", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn open(&self, cache_name: &str) -> Result<Arc<dyn MetadataIndex>> {
        let mut indexes = self.indexes.lock().await;
        if let Some(index) = indexes.get(cache_name) {
            return Ok(index.clone());
        }

        let path = self.index_path(cache_name);
        let index = Arc::new(FileIndex::load(path).await?);
        indexes.insert(cache_name.to_string(), index.clone());
        debug!(cache = cache_name, "Opened timestamp index");
        Ok(index)
    }
}

/// A timestamp index mirrored to a JSON file.
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
    index: Mutex<TimestampIndex>,
}

impl FileIndex {
    async fn load(path: PathBuf) -> Result<Self> {
        let index = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                FetchCacheError::Metadata(format!("Corrupt index {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => TimestampIndex::new(),
            Err(e) => return Err(metadata_io("read index", &path, e)),
        };

        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    async fn persist(&self, index: &TimestampIndex) -> Result<()> {
        let bytes = serde_json::to_vec(index)
            .map_err(|e| FetchCacheError::Metadata(format!("Failed to encode index: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| metadata_io("create index directory", parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| metadata_io("write index", &tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| metadata_io("replace index", &self.path, e))?;
        Ok(())
    }

    /// Applies `change` to a copy of the index and keeps it only once it is on disk.
    async fn update(&self, change: impl FnOnce(&mut TimestampIndex) + Send) -> Result<()> {
        let mut guard = self.index.lock().await;
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl MetadataIndex for FileIndex {
    async fn set_timestamp(&self, url: &str, timestamp_ms: i64) -> Result<()> {
        self.update(|index| index.upsert(url, timestamp_ms)).await
    }

    async fn snapshot(&self) -> Result<TimestampIndex> {
        Ok(self.index.lock().await.clone())
    }

    async fn delete_keys(&self, urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            return Ok(());
        }
        self.update(|index| index.remove_keys(urls)).await
    }
}

fn metadata_io(action: &str, path: &Path, err: std::io::Error) -> FetchCacheError {
    FetchCacheError::Metadata(format!("Failed to {} {}: {}", action, path.display(), err))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_open_same_index() {
        let store = MemoryMetadataStore::new();
        store.open("c").await.unwrap().set_timestamp("a", 1).await.unwrap();

        let snapshot = store.open("c").await.unwrap().snapshot().await.unwrap();
        assert!(snapshot.contains("a"));

        let other = store.open("other").await.unwrap().snapshot().await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_file_index_created_lazily() {
        let dir = tempdir().unwrap();
        let store = FileMetadataStore::new(dir.path());
        store.init().await.unwrap();

        let index = store.open("lazy").await.unwrap();
        assert!(index.snapshot().await.unwrap().is_empty());
        assert!(!store.index_path("lazy").exists());

        index.set_timestamp("https://example.com/", 5).await.unwrap();
        assert!(store.index_path("lazy").exists());
    }

    #[tokio::test]
    async fn test_file_index_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let store = FileMetadataStore::new(dir.path());
            let index = store.open("durable").await.unwrap();
            index.set_timestamp("a", 10).await.unwrap();
            index.set_timestamp("b", 20).await.unwrap();
            index.delete_keys(&["a".to_string()]).await.unwrap();
        }

        let store = FileMetadataStore::new(dir.path());
        let snapshot = store.open("durable").await.unwrap().snapshot().await.unwrap();
        assert!(!snapshot.contains("a"));
        assert_eq!(snapshot.get("b").unwrap().timestamp_ms, 20);
    }

    #[tokio::test]
    async fn test_file_index_names_are_isolated() {
        let dir = tempdir().unwrap();
        let store = FileMetadataStore::new(dir.path());

        store.open("../escape").await.unwrap().set_timestamp("a", 1).await.unwrap();

        let path = store.index_path("../escape");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(store.open("other").await.unwrap().snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_index_long_cache_name() {
        let dir = tempdir().unwrap();
        let store = FileMetadataStore::new(dir.path());
        let name = "n".repeat(200);

        let index = store.open(&name).await.unwrap();
        index.set_timestamp("a", 1).await.unwrap();

        let file_name = store.index_path(&name);
        assert_eq!(file_name.file_name().unwrap().len(), 64 + ".json".len());

        let reopened = FileMetadataStore::new(dir.path());
        let snapshot = reopened.open(&name).await.unwrap().snapshot().await.unwrap();
        assert!(snapshot.contains("a"));
    }

    #[tokio::test]
    async fn test_file_index_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = FileMetadataStore::new(dir.path());
        std::fs::write(store.index_path("broken"), b"not json").unwrap();

        let result = store.open("broken").await;
        assert!(matches!(result, Err(FetchCacheError::Metadata(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_keys_is_ok() {
        let dir = tempdir().unwrap();
        let store = FileMetadataStore::new(dir.path());
        let index = store.open("c").await.unwrap();

        index.set_timestamp("a", 1).await.unwrap();
        index.delete_keys(&["missing".to_string()]).await.unwrap();
        assert_eq!(index.snapshot().await.unwrap().len(), 1);
    }
}
