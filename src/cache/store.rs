//! Cache Store Module
//!
//! Maps resource keys to files under the cache root. A single store-wide
//! read/write lock keeps readers from ever observing a write in progress.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CachedEntry, ResourceKey, STAGING_PREFIX};
use crate::error::{ProxyError, Result};

// == Cache Store ==
/// Durable key to content mapping with modification-time freshness.
#[derive(Debug)]
pub struct CacheStore {
    /// Directory every key resolves under
    root: PathBuf,
    /// Shared for lookups and reads, exclusive for writes
    lock: RwLock<()>,
}

impl CacheStore {
    // == Constructor ==
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| ProxyError::storage("failed to create cache root", e))?;

        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    /// Location of a key's content file.
    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    // == Lookup ==
    /// Reports whether a key is present and when it was last written.
    ///
    /// Absence is a normal result; so is a path occupied by a directory.
    pub async fn lookup(&self, key: &ResourceKey) -> Option<CachedEntry> {
        let path = self.path_for(key);
        let _guard = self.lock.read().await;

        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        let modified = metadata.modified().ok()?;

        Some(CachedEntry {
            path,
            modified,
            len: metadata.len(),
        })
    }

    // == Read ==
    /// Reads the full content of a looked-up entry.
    pub async fn read(&self, entry: &CachedEntry) -> Result<Bytes> {
        let _guard = self.lock.read().await;
        tokio::fs::read(&entry.path)
            .await
            .map(Bytes::from)
            .map_err(|e| ProxyError::storage("failed to read cached file", e))
    }

    // == Write ==
    /// Commits `content` under `key`, replacing any previous entry.
    ///
    /// Content is staged in a temporary file next to the destination and
    /// renamed into place, so a concurrent lookup sees either the old or the
    /// new complete file.
    pub async fn write(&self, key: &ResourceKey, content: Bytes) -> Result<CachedEntry> {
        let path = self.path_for(key);
        let _guard = self.lock.write().await;

        let target = path.clone();
        let len = content.len();
        tokio::task::spawn_blocking(move || write_atomic(&target, &content))
            .await
            .map_err(|e| ProxyError::Internal(format!("write task failed: {}", e)))??;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ProxyError::storage("failed to stat cached file", e))?;
        let modified = metadata
            .modified()
            .map_err(|e| ProxyError::storage("failed to read modification time", e))?;

        debug!("Stored {} bytes for {}", len, key);

        Ok(CachedEntry {
            path,
            modified,
            len: metadata.len(),
        })
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ProxyError::Storage(format!("{} has no parent", path.display())))?;

    std::fs::create_dir_all(parent)
        .map_err(|e| ProxyError::storage("failed to create cache directories", e))?;

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(parent)
        .map_err(|e| ProxyError::storage("failed to create cached file", e))?;

    staged
        .write_all(content)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| ProxyError::storage("failed to write to cached file", e))?;

    staged
        .persist(path)
        .map_err(|e| ProxyError::storage("failed to commit cached file", e.error))?;

    Ok(())
}
