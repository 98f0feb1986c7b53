//! Reward accumulation engine
//!
//! The only stateful stage in the pipeline. One engine instance serves
//! one partition and exclusively owns that partition's customer state;
//! the per-partition worker discipline means no two invocations for the
//! same key ever interleave, so the read-modify-write needs no lock.

use retail_events::{Purchase, RewardAccumulator};
use tracing::trace;

use crate::error::{Result, StateError};
use crate::state::KeyValueStore;

/// Stateful processor folding purchases into per-customer reward totals
pub struct RewardEngine<S> {
    store: S,
    partition: u32,
}

impl<S: KeyValueStore> RewardEngine<S> {
    /// Create an engine over its partition's state store
    pub fn new(store: S, partition: u32) -> Self {
        Self { store, partition }
    }

    /// Partition this engine serves
    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one purchase: derive its reward, fold in the customer's
    /// accumulated total, write the new total back, then return
    ///
    /// The write happens before the result is handed downstream. A crash
    /// after the write but before emission is recovered by reprocessing
    /// the input event; a crash before the write never emits a
    /// partially-applied result. A store failure fails this record's
    /// attempt; skipping the accumulation would corrupt totals.
    pub async fn process(&self, purchase: &Purchase) -> Result<RewardAccumulator> {
        let mut reward = RewardAccumulator::from_purchase(purchase);
        let key = reward.customer_id.clone().into_bytes();

        let accumulated = match self.store.get(&key).await? {
            Some(bytes) => {
                bincode::deserialize::<i64>(&bytes).map_err(|e| StateError::DeserializationFailed {
                    key: reward.customer_id.clone(),
                    reason: e.to_string(),
                })?
            }
            None => 0,
        };

        reward.add_accumulated(accumulated);

        let encoded = bincode::serialize(&reward.total_reward_points).map_err(|e| {
            StateError::SerializationFailed {
                key: reward.customer_id.clone(),
                reason: e.to_string(),
            }
        })?;

        // Write-then-emit: persist the new total before returning
        self.store.put(&key, &encoded).await?;

        trace!(
            customer = %reward.customer_id,
            current = reward.current_reward_points,
            total = reward.total_reward_points,
            partition = self.partition,
            "reward accumulated"
        );

        Ok(reward)
    }

    /// Accumulated total currently stored for a customer, 0 if absent
    pub async fn accumulated_total(&self, customer_id: &str) -> Result<i64> {
        match self.store.get(customer_id.as_bytes()).await? {
            Some(bytes) => {
                let total = bincode::deserialize::<i64>(&bytes).map_err(|e| {
                    StateError::DeserializationFailed {
                        key: customer_id.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(total)
            }
            None => Ok(0),
        }
    }
}
