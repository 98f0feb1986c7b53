//! State store trait definition
//!
//! A simple async byte-oriented key-value interface. The reward engine is
//! written against this trait so the backing store can be swapped without
//! touching accumulation logic.

use async_trait::async_trait;

use crate::error::StateResult;

/// Core trait for key-value state stores
///
/// Implementations must be safe for concurrent access and make individual
/// operations atomic. The pipeline's per-partition discipline means a
/// given key is only ever touched by one worker, but stores may be shared
/// with background tasks (changelog persistence, stats readers).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, or `None` if the key does not exist
    async fn get(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>>;

    /// Store a value, overwriting any existing entry
    async fn put(&self, key: &[u8], value: &[u8]) -> StateResult<()>;

    /// Delete a key; deleting a missing key is not an error
    async fn delete(&self, key: &[u8]) -> StateResult<()>;

    /// List all keys with the given prefix; empty prefix matches all
    async fn list_keys(&self, prefix: &[u8]) -> StateResult<Vec<Vec<u8>>>;

    /// Remove all entries
    async fn clear(&self) -> StateResult<()> {
        let keys = self.list_keys(b"").await?;
        for key in keys {
            self.delete(&key).await?;
        }
        Ok(())
    }

    /// Number of entries
    async fn count(&self) -> StateResult<usize> {
        Ok(self.list_keys(b"").await?.len())
    }

    /// Check existence without fetching the value
    async fn contains(&self, key: &[u8]) -> StateResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    // Generic tests that any KeyValueStore implementation should pass
    pub async fn test_store_basic_ops<S: KeyValueStore>(store: S) {
        store.put(b"customer:1", b"20").await.unwrap();
        assert_eq!(
            store.get(b"customer:1").await.unwrap(),
            Some(b"20".to_vec())
        );

        assert_eq!(store.get(b"customer:missing").await.unwrap(), None);

        store.put(b"customer:1", b"45").await.unwrap();
        assert_eq!(
            store.get(b"customer:1").await.unwrap(),
            Some(b"45".to_vec())
        );

        store.delete(b"customer:1").await.unwrap();
        assert_eq!(store.get(b"customer:1").await.unwrap(), None);

        // Deleting a missing key is fine
        store.delete(b"customer:missing").await.unwrap();
    }

    pub async fn test_store_list_keys<S: KeyValueStore>(store: S) {
        store.clear().await.unwrap();

        store.put(b"reward:a", b"1").await.unwrap();
        store.put(b"reward:b", b"2").await.unwrap();
        store.put(b"meta:x", b"3").await.unwrap();

        assert_eq!(store.list_keys(b"reward:").await.unwrap().len(), 2);
        assert_eq!(store.list_keys(b"meta:").await.unwrap().len(), 1);
        assert_eq!(store.list_keys(b"").await.unwrap().len(), 3);
    }

    pub async fn test_store_count_and_contains<S: KeyValueStore>(store: S) {
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!store.contains(b"k").await.unwrap());

        store.put(b"k", b"v").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.contains(b"k").await.unwrap());
    }
}
