//! JSON-file implementation of the `KeyValueStore` trait.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use afrikunle_core::error::ClientError;
use afrikunle_core::storage::KeyValueStore;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

type Entries = BTreeMap<String, String>;

/// Stores all entries in one JSON object on disk.
///
/// Writes replace the file atomically (temp file + rename), so a crash
/// mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ClientError::CacheUnavailable(e.to_string())),
        }
    }

    async fn read_all(&self) -> Result<Entries, ClientError> {
        parse(&self.read_bytes().await?)
            .map_err(|e| ClientError::CacheUnavailable(format!("corrupt cache file: {e}")))
    }

    /// Entries to build the next write on. A corrupt file is moved aside to
    /// `<name>.corrupt` and replaced, so one bad file cannot block every
    /// later write.
    async fn read_for_write(&self) -> Result<Entries, ClientError> {
        let bytes = self.read_bytes().await?;
        match parse(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let aside = self.path.with_extension("corrupt");
                warn!(path = %self.path.display(), error = %e, "cache file corrupt, starting fresh");
                if let Err(e) = tokio::fs::rename(&self.path, &aside).await {
                    warn!(path = %aside.display(), error = %e, "could not keep corrupt cache file");
                }
                Ok(Entries::new())
            }
        }
    }
}

fn parse(bytes: &[u8]) -> Result<Entries, serde_json::Error> {
    if bytes.is_empty() {
        return Ok(Entries::new());
    }
    serde_json::from_slice(bytes)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_for_write().await?;
        entries.insert(key.to_owned(), value.to_owned());

        let bytes = serde_json::to_vec_pretty(&entries)
            .map_err(|e| ClientError::CacheUnavailable(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| ClientError::CacheUnavailable(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ClientError::CacheUnavailable(e.to_string()))
    }
}
