//! Deterministic re-keying partitioner for the rewards path
//!
//! Every purchase for a given customer must land on the partition that
//! holds that customer's accumulator entry. The partitioner therefore
//! uses a stable hash (FNV-1a) rather than the standard library's seeded
//! hasher: the mapping has to survive restarts and agree across
//! processes, or the accumulation engine's locality guarantee breaks.

use tracing::debug;

use crate::error::{ProcessorError, Result};

/// Maps a customer key to a partition index
#[derive(Debug, Clone, Copy)]
pub struct RewardPartitioner {
    partition_count: u32,
}

impl RewardPartitioner {
    /// Create a partitioner over the given partition count
    pub fn new(partition_count: u32) -> Result<Self> {
        if partition_count == 0 {
            return Err(ProcessorError::Configuration(
                "partition count must be greater than 0".to_string(),
            ));
        }
        Ok(Self { partition_count })
    }

    /// Partition count this partitioner was built with
    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// Partition index for a customer key
    ///
    /// Deterministic: the same (key, partition count) pair always yields
    /// the same partition.
    pub fn partition(&self, customer_id: &str) -> u32 {
        (fnv1a(customer_id.as_bytes()) % u64::from(self.partition_count)) as u32
    }
}

/// FNV-1a hash, stable across processes and Rust versions
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Startup assertion that the rewards channel and the state changelog
/// use the same partition count
///
/// A mismatch means a customer's events and their accumulator entry can
/// land on different partitions, which corrupts reward totals silently.
/// Detect it at startup and refuse to run.
pub fn verify_co_partitioning(rewards_partitions: u32, changelog_partitions: u32) -> Result<()> {
    if rewards_partitions != changelog_partitions {
        return Err(ProcessorError::Partitioning {
            reason: format!(
                "rewards channel has {} partitions but state changelog has {}",
                rewards_partitions, changelog_partitions
            ),
        });
    }

    debug!(
        partitions = rewards_partitions,
        "co-partitioning verified"
    );
    Ok(())
}
