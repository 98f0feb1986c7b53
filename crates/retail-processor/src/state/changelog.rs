//! Durable changelog for rebuilding state after restart
//!
//! `ChangelogStore` decorates any [`KeyValueStore`]: every put is
//! recorded in an append-only log before it reaches the inner store, so
//! replaying the log in order reconstructs the store's contents exactly.
//! The log can be persisted to disk and validated on load.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::store::KeyValueStore;
use crate::error::{StateError, StateResult};

/// A persisted changelog: ordered put entries plus integrity metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogSnapshot {
    /// Number of entries, checked against `entries.len()` on load
    pub entry_count: usize,
    /// Checksum of all entries, checked on load
    pub checksum: u64,
    /// Ordered (key, value) put operations
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl ChangelogSnapshot {
    fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entry_count: entries.len(),
            checksum: Self::calculate_checksum(&entries),
            entries,
        }
    }

    fn calculate_checksum(entries: &[(Vec<u8>, Vec<u8>)]) -> u64 {
        // FNV-1a over all bytes; stable across processes
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for (key, value) in entries {
            for byte in key.iter().chain(value.iter()) {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
        }
        hash
    }

    /// Validate entry count and checksum
    pub fn validate(&self) -> StateResult<()> {
        if self.entries.len() != self.entry_count {
            return Err(StateError::RestoreFailed {
                reason: format!(
                    "entry count mismatch: expected {}, got {}",
                    self.entry_count,
                    self.entries.len()
                ),
            });
        }

        let checksum = Self::calculate_checksum(&self.entries);
        if checksum != self.checksum {
            return Err(StateError::RestoreFailed {
                reason: format!(
                    "checksum mismatch: expected {:x}, got {:x}",
                    self.checksum, checksum
                ),
            });
        }

        Ok(())
    }
}

/// Store decorator that records every write to an append-only changelog
///
/// The changelog is written before the inner store, so a crash between
/// the two leaves the log ahead of the store; replay is idempotent
/// (last write wins per key), so recovery simply replays everything.
pub struct ChangelogStore<S> {
    inner: S,
    log: Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>>,
}

impl<S: KeyValueStore> ChangelogStore<S> {
    /// Wrap a store with an empty changelog
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Access the inner store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Snapshot the changelog for persistence
    pub async fn snapshot(&self) -> ChangelogSnapshot {
        let log = self.log.lock().await;
        ChangelogSnapshot::new(log.clone())
    }

    /// Number of entries currently in the changelog
    pub async fn log_len(&self) -> usize {
        self.log.lock().await.len()
    }

    /// Rebuild the inner store by replaying a changelog in order
    ///
    /// Clears the current contents first. The changelog itself is reset
    /// to the replayed entries so subsequent snapshots stay complete.
    pub async fn restore(&self, snapshot: ChangelogSnapshot) -> StateResult<()> {
        snapshot.validate()?;

        self.inner.clear().await?;
        for (key, value) in &snapshot.entries {
            self.inner.put(key, value).await?;
        }

        let mut log = self.log.lock().await;
        *log = snapshot.entries;

        info!(entries = log.len(), "state restored from changelog");
        Ok(())
    }

    /// Persist the changelog to a file
    pub async fn persist<P: AsRef<Path>>(&self, path: P) -> StateResult<()> {
        let snapshot = self.snapshot().await;
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::Changelog {
                    reason: format!("failed to create directory: {}", e),
                })?;
        }

        let bytes = bincode::serialize(&snapshot).map_err(|e| StateError::Changelog {
            reason: e.to_string(),
        })?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| StateError::Changelog {
                reason: format!("failed to write {}: {}", path.display(), e),
            })?;

        info!(
            entries = snapshot.entry_count,
            path = %path.display(),
            "changelog persisted"
        );
        Ok(())
    }

    /// Load a changelog snapshot from a file and validate it
    pub async fn load_snapshot<P: AsRef<Path>>(path: P) -> StateResult<ChangelogSnapshot> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StateError::RestoreFailed {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let snapshot: ChangelogSnapshot =
            bincode::deserialize(&bytes).map_err(|e| StateError::RestoreFailed {
                reason: e.to_string(),
            })?;

        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for ChangelogStore<S> {
    async fn get(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> StateResult<()> {
        // Changelog first: the log may run ahead of the store but never
        // behind it, so replay always covers the store's contents.
        {
            let mut log = self.log.lock().await;
            log.push((key.to_vec(), value.to_vec()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> StateResult<()> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self, prefix: &[u8]) -> StateResult<Vec<Vec<u8>>> {
        self.inner.list_keys(prefix).await
    }

    async fn count(&self) -> StateResult<usize> {
        self.inner.count().await
    }
}
