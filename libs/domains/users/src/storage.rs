use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Namespace under which user images are stored.
pub const USER_IMAGE_NAMESPACE: &str = "images/users";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write blob '{key}': {source}")]
    Write { key: String, source: io::Error },

    #[error("failed to delete blob '{key}': {source}")]
    Delete { key: String, source: io::Error },

    #[error("failed to probe blob '{key}': {source}")]
    Probe { key: String, source: io::Error },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Opaque blob store addressed by string keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob under a fresh key in `namespace`; returns the key.
    async fn put(&self, payload: &[u8], namespace: &str) -> StorageResult<String>;

    /// Delete a blob. `Ok(false)` means there was nothing to delete.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Generate a fresh namespaced key for a blob: `{namespace}/{uuid}.{ext}`.
///
/// The extension comes from a magic-byte sniff; callers have already
/// validated that the payload is an image, the sniff only names the file.
fn new_blob_key(namespace: &str, payload: &[u8]) -> String {
    format!(
        "{}/{}.{}",
        namespace.trim_matches('/'),
        Uuid::now_v7().simple(),
        detect_extension(payload)
    )
}

fn detect_extension(payload: &[u8]) -> &'static str {
    match payload {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "bin",
    }
}

/// In-memory implementation of BlobStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, payload: &[u8], namespace: &str) -> StorageResult<String> {
        let key = new_blob_key(namespace, payload);
        let mut blobs = self.blobs.write().await;
        blobs.insert(key.clone(), payload.to_vec());

        tracing::debug!(key = %key, bytes = payload.len(), "Stored blob");
        Ok(key)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut blobs = self.blobs.write().await;
        Ok(blobs.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }
}

/// Filesystem-backed blob store rooted at a single directory.
///
/// Keys map to relative paths under the root; `put` creates intermediate
/// directories as needed. Keys are generated internally, never taken from
/// request input.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if missing. Called at startup and by the
    /// readiness probe.
    pub async fn ensure_root(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Write {
                key: self.root.display().to_string(),
                source,
            })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, payload: &[u8], namespace: &str) -> StorageResult<String> {
        let key = new_blob_key(namespace, payload);
        let path = self.blob_path(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Write {
                    key: key.clone(),
                    source,
                })?;
        }

        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| StorageError::Write {
                key: key.clone(),
                source,
            })?;

        tracing::debug!(key = %key, bytes = payload.len(), "Stored blob");
        Ok(key)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Delete {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match tokio::fs::metadata(self.blob_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Probe {
                key: key.to_string(),
                source,
            }),
        }
    }
}
