//! Partitioned purchase log source
//!
//! The inbound purchase stream is an ordered, partitioned, offset-addressed
//! log behind the [`PurchaseSource`] trait. Consumers poll one partition at
//! a time and commit offsets after processing; on restart, reading resumes
//! from the last committed offset so uncommitted records are replayed.

use crate::error::{ProcessorError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// One record read from a log partition
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub partition: u32,
    pub offset: u64,
    pub timestamp_ms: i64,
    pub payload: Vec<u8>,
}

/// Ordered, partitioned record log
///
/// Records carry no explicit key; the key is implicit in partition
/// placement. Producers assign partitions with `RewardPartitioner` over
/// the derived customer id, so every output channel re-derives the same
/// key from the decoded purchase.
#[async_trait]
pub trait PurchaseSource: Send + Sync {
    /// Read the next unread record from `partition`, or `None` at the end
    async fn poll(&self, partition: u32) -> Result<Option<SourceRecord>>;

    /// Mark everything up to and including `offset` as processed
    async fn commit(&self, partition: u32, offset: u64) -> Result<()>;

    /// Last committed offset for `partition`, if any
    async fn committed(&self, partition: u32) -> Result<Option<u64>>;

    /// Number of partitions in this log
    fn partition_count(&self) -> u32;
}

#[derive(Debug, Default)]
struct PartitionLog {
    records: Vec<SourceRecord>,
    committed: Option<u64>,
    read_index: usize,
}

/// In-memory log with per-partition ordering and committed offsets
///
/// Appends assign contiguous offsets per partition. `reset_to_committed`
/// rewinds the read position to just past the committed offset, which is
/// what a process restart does to a real consumer.
pub struct InMemoryLog {
    partitions: DashMap<u32, PartitionLog>,
    partition_count: u32,
}

impl InMemoryLog {
    pub fn new(partition_count: u32) -> Self {
        let partitions = DashMap::new();
        for p in 0..partition_count {
            partitions.insert(p, PartitionLog::default());
        }
        Self {
            partitions,
            partition_count,
        }
    }

    /// Append a record, returning its assigned offset
    pub fn append(&self, partition: u32, timestamp_ms: i64, payload: Vec<u8>) -> Result<u64> {
        let mut log = self
            .partitions
            .get_mut(&partition)
            .ok_or_else(|| ProcessorError::Source(format!("unknown partition {}", partition)))?;
        let offset = log.records.len() as u64;
        log.records.push(SourceRecord {
            partition,
            offset,
            timestamp_ms,
            payload,
        });
        Ok(offset)
    }

    /// Rewind every partition's read position to just past its commit
    pub fn reset_to_committed(&self) {
        for mut log in self.partitions.iter_mut() {
            log.read_index = match log.committed {
                Some(offset) => (offset + 1) as usize,
                None => 0,
            };
        }
    }

    /// Number of records appended to `partition`
    pub fn len(&self, partition: u32) -> usize {
        self.partitions
            .get(&partition)
            .map(|log| log.records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PurchaseSource for InMemoryLog {
    async fn poll(&self, partition: u32) -> Result<Option<SourceRecord>> {
        let mut log = self
            .partitions
            .get_mut(&partition)
            .ok_or_else(|| ProcessorError::Source(format!("unknown partition {}", partition)))?;
        if log.read_index >= log.records.len() {
            return Ok(None);
        }
        let record = log.records[log.read_index].clone();
        log.read_index += 1;
        Ok(Some(record))
    }

    async fn commit(&self, partition: u32, offset: u64) -> Result<()> {
        let mut log = self
            .partitions
            .get_mut(&partition)
            .ok_or_else(|| ProcessorError::Source(format!("unknown partition {}", partition)))?;
        debug!(partition, offset, "committing offset");
        log.committed = Some(offset);
        Ok(())
    }

    async fn committed(&self, partition: u32) -> Result<Option<u64>> {
        let log = self
            .partitions
            .get(&partition)
            .ok_or_else(|| ProcessorError::Source(format!("unknown partition {}", partition)))?;
        Ok(log.committed)
    }

    fn partition_count(&self) -> u32 {
        self.partition_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offsets_are_contiguous_per_partition() {
        let log = InMemoryLog::new(2);

        assert_eq!(log.append(0, 10, vec![1]).unwrap(), 0);
        assert_eq!(log.append(0, 20, vec![2]).unwrap(), 1);
        assert_eq!(log.append(1, 30, vec![3]).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_poll_in_append_order() {
        let log = InMemoryLog::new(1);
        log.append(0, 10, vec![1]).unwrap();
        log.append(0, 20, vec![2]).unwrap();

        let first = log.poll(0).await.unwrap().unwrap();
        let second = log.poll(0).await.unwrap().unwrap();
        assert_eq!(first.payload, vec![1]);
        assert_eq!(second.offset, 1);
        assert!(log.poll(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_partition_rejected() {
        let log = InMemoryLog::new(1);
        assert!(log.poll(5).await.is_err());
        assert!(log.append(5, 0, vec![]).is_err());
    }

    #[tokio::test]
    async fn test_reset_replays_past_the_commit() {
        let log = InMemoryLog::new(1);
        log.append(0, 10, vec![1]).unwrap();
        log.append(0, 20, vec![2]).unwrap();
        log.append(0, 30, vec![3]).unwrap();

        log.poll(0).await.unwrap();
        log.poll(0).await.unwrap();
        log.commit(0, 0).await.unwrap();

        // Records past offset 0 were read but never committed
        log.reset_to_committed();

        let replayed = log.poll(0).await.unwrap().unwrap();
        assert_eq!(replayed.offset, 1);
        assert_eq!(log.committed(0).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_reset_without_commit_rewinds_to_start() {
        let log = InMemoryLog::new(1);
        log.append(0, 10, vec![1]).unwrap();
        log.poll(0).await.unwrap();

        log.reset_to_committed();
        assert_eq!(log.poll(0).await.unwrap().unwrap().offset, 0);
    }
}
