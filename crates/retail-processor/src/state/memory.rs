//! In-memory state store backed by DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::store::KeyValueStore;
use crate::error::StateResult;

/// Access counters for the in-memory store
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of get operations
    pub get_count: u64,
    /// Number of put operations
    pub put_count: u64,
    /// Number of delete operations
    pub delete_count: u64,
    /// Gets that found a value
    pub hit_count: u64,
    /// Gets that found nothing
    pub miss_count: u64,
}

/// In-memory key-value store
///
/// The working copy of per-partition reward state. Fast, concurrent, and
/// volatile: pair it with [`super::ChangelogStore`] when the contents
/// must survive a restart.
pub struct MemoryStore {
    data: Arc<DashMap<Vec<u8>, Vec<u8>>>,
    stats: Arc<RwLock<StoreStats>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Snapshot of current access counters
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>> {
        trace!(?key, "get");

        let mut stats = self.stats.write().await;
        stats.get_count += 1;

        let result = self.data.get(key).map(|entry| entry.value().clone());
        if result.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }

        Ok(result)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> StateResult<()> {
        trace!(?key, value_len = value.len(), "put");

        self.stats.write().await.put_count += 1;
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StateResult<()> {
        trace!(?key, "delete");

        self.stats.write().await.delete_count += 1;
        self.data.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &[u8]) -> StateResult<Vec<Vec<u8>>> {
        let keys = self
            .data
            .iter()
            .filter(|entry| prefix.is_empty() || entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        Ok(keys)
    }

    async fn clear(&self) -> StateResult<()> {
        debug!("clearing all state");
        self.data.clear();
        Ok(())
    }

    async fn count(&self) -> StateResult<usize> {
        Ok(self.data.len())
    }

    async fn contains(&self, key: &[u8]) -> StateResult<bool> {
        Ok(self.data.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::tests::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        test_store_basic_ops(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_list_keys() {
        test_store_list_keys(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_count_and_contains() {
        test_store_count_and_contains(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new();

        store.put(b"k1", b"v1").await.unwrap();
        store.get(b"k1").await.unwrap(); // hit
        store.get(b"k2").await.unwrap(); // miss
        store.delete(b"k1").await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.put_count, 1);
        assert_eq!(stats.get_count, 2);
        assert_eq!(stats.delete_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for j in 0..25 {
                    let key = format!("key:{}:{}", i, j).into_bytes();
                    store.put(&key, b"v").await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 200);
    }
}
