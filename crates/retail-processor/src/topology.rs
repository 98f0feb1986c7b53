//! Pipeline topology and per-partition workers
//!
//! `PurchaseTopology` assembles the whole dataflow: it verifies the
//! co-partitioning invariant, wires the sink multiplexer, and builds one
//! `PartitionWorker` per source partition. Each worker exclusively owns
//! its partition's reward state, joiner and router, so the hot path runs
//! without locks; partitions only share the source handle, the sink and
//! the stats.
//!
//! The source log must be keyed so that all purchases for one reward
//! customer land on the partition `RewardPartitioner` assigns to that
//! customer. That is the same alignment the startup check asserts
//! between the rewards channel and the state changelog.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use retail_config::{PipelineConfig, TopicConfig};
use retail_events::Purchase;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, AuditStage};
use crate::codec::RecordCodec;
use crate::core::{EventTimeExtractor, PurchaseTimeExtractor};
use crate::error::{ProcessorError, Result};
use crate::join::{CorrelationJoiner, JoinSide};
use crate::log::{PurchaseSource, SourceRecord};
use crate::partition::{verify_co_partitioning, RewardPartitioner};
use crate::rewards::RewardEngine;
use crate::router::DepartmentRouter;
use crate::sink::{RecordSink, SinkKey, SinkMultiplexer};
use crate::state::{ChangelogSnapshot, ChangelogStore, MemoryStore};
use crate::transform;

/// Counters shared by every partition worker
#[derive(Debug, Default)]
pub struct TopologyStats {
    records_processed: AtomicU64,
    records_malformed: AtomicU64,
    pairs_joined: AtomicU64,
    audits_saved: AtomicU64,
    audit_failures: AtomicU64,
    high_value_exported: AtomicU64,
}

impl TopologyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_processed(&self) {
        self.records_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.records_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_joined(&self, pairs: u64) {
        self.pairs_joined.fetch_add(pairs, Ordering::Relaxed);
    }

    pub fn inc_audit_saved(&self) {
        self.audits_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_high_value(&self) {
        self.high_value_exported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed.load(Ordering::Relaxed)
    }

    pub fn records_malformed(&self) -> u64 {
        self.records_malformed.load(Ordering::Relaxed)
    }

    pub fn pairs_joined(&self) -> u64 {
        self.pairs_joined.load(Ordering::Relaxed)
    }

    pub fn audits_saved(&self) -> u64 {
        self.audits_saved.load(Ordering::Relaxed)
    }

    pub fn audit_failures(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    pub fn high_value_exported(&self) -> u64 {
        self.high_value_exported.load(Ordering::Relaxed)
    }
}

type WorkerStore = ChangelogStore<MemoryStore>;

/// Single-threaded processor for one source partition
pub struct PartitionWorker<S, C, K>
where
    S: PurchaseSource,
    C: RecordCodec,
    K: RecordSink,
{
    partition: u32,
    source: Arc<S>,
    codec: C,
    mux: Arc<SinkMultiplexer<C, K>>,
    engine: RewardEngine<WorkerStore>,
    router: DepartmentRouter,
    joiner: CorrelationJoiner,
    audit: AuditStage,
    extractor: PurchaseTimeExtractor,
    topics: TopicConfig,
    high_value_threshold: f64,
    stats: Arc<TopologyStats>,
}

impl<S, C, K> PartitionWorker<S, C, K>
where
    S: PurchaseSource,
    C: RecordCodec + Clone,
    K: RecordSink,
{
    /// Run the full dataflow for one source record
    ///
    /// An undecodable payload is skipped with a warning; its offset is
    /// still committed by the caller so it is not redelivered. Any other
    /// error fails the attempt before the commit, leaving the record to
    /// be replayed.
    pub async fn process_record(&mut self, record: SourceRecord) -> Result<()> {
        let purchase: Purchase = match self.codec.decode(&record.payload) {
            Ok(purchase) => purchase,
            Err(e) => {
                warn!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "skipping malformed record"
                );
                self.stats.inc_malformed();
                return Ok(());
            }
        };

        let event_ts = self.extractor.extract(&purchase, record.timestamp_ms);
        let masked = transform::mask_purchase(&purchase);

        // Every keyed output channel carries the same derived customer
        // key, so the branch, join and reward streams stay co-partitioned
        // for downstream consumers
        let reward_key = masked.reward_customer_id();

        let pattern = transform::project_pattern(&masked);
        self.mux
            .emit(
                &self.topics.patterns,
                SinkKey::text(reward_key.clone()),
                &pattern,
            )
            .await?;

        // State write happens inside the engine before the reward is
        // returned, so the emission below never precedes it
        let reward = self.engine.process(&masked).await?;
        self.mux
            .emit(&self.topics.rewards, SinkKey::text(reward_key.clone()), &reward)
            .await?;

        let label = self.router.route(&masked).map(str::to_string);
        if let Some(label) = label {
            let (channel, side) = match label.as_str() {
                "coffee" => (&self.topics.coffee, JoinSide::Coffee),
                _ => (&self.topics.electronics, JoinSide::Electronics),
            };
            self.mux
                .emit(channel, SinkKey::text(reward_key.clone()), &masked)
                .await?;

            let pairs = self.joiner.process(side, &reward_key, &masked, event_ts);
            self.stats.add_joined(pairs.len() as u64);
            for pair in pairs {
                self.mux
                    .emit(
                        &self.topics.correlated,
                        SinkKey::text(pair.customer_id.clone()),
                        &pair,
                    )
                    .await?;
            }
        }

        // Audit sees the original, unmasked purchase. Exhausted retries
        // are counted but do not halt the partition.
        match self.audit.inspect(&purchase).await {
            Ok(()) => {
                if purchase.employee_id == self.audit.employee_id() {
                    self.stats.inc_audit_saved();
                }
            }
            Err(e) => {
                warn!(partition = self.partition, error = %e, "audit save abandoned");
                self.stats.inc_audit_failure();
            }
        }

        if transform::is_high_value(&masked, self.high_value_threshold) {
            self.mux
                .emit(
                    &self.topics.purchase_masked,
                    SinkKey::EpochMillis(event_ts),
                    &masked,
                )
                .await?;
            self.stats.inc_high_value();
        }

        self.stats.inc_processed();
        Ok(())
    }

    /// Process records until the partition is exhausted
    ///
    /// Offsets are committed one record at a time, strictly after that
    /// record's state write.
    pub async fn drain(&mut self) -> Result<u64> {
        let mut processed = 0u64;
        while let Some(record) = self.source.poll(self.partition).await? {
            let offset = record.offset;
            self.process_record(record).await?;
            self.source.commit(self.partition, offset).await?;
            processed += 1;
            // Keep join memory bounded on long batches
            if processed % 256 == 0 {
                self.joiner.evict_empty_keys();
            }
        }
        self.joiner.evict_empty_keys();
        debug!(partition = self.partition, processed, "partition drained");
        Ok(processed)
    }

    /// Poll the partition until `stop` is set, idling briefly when the
    /// log has no new records
    pub async fn run(&mut self, stop: Arc<AtomicBool>) -> Result<()> {
        info!(partition = self.partition, "partition worker started");
        while !stop.load(Ordering::Relaxed) {
            match self.source.poll(self.partition).await? {
                Some(record) => {
                    let offset = record.offset;
                    self.process_record(record).await?;
                    self.source.commit(self.partition, offset).await?;
                }
                None => {
                    self.joiner.evict_empty_keys();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
        info!(partition = self.partition, "partition worker stopped");
        Ok(())
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Rebuild this partition's reward state from a changelog snapshot
    pub async fn restore(&self, snapshot: ChangelogSnapshot) -> Result<()> {
        self.engine.store().restore(snapshot).await?;
        Ok(())
    }

    /// Snapshot this partition's reward state changelog
    pub async fn changelog_snapshot(&self) -> ChangelogSnapshot {
        self.engine.store().snapshot().await
    }

    /// Stored reward total for a customer on this partition
    pub async fn reward_total(&self, customer_id: &str) -> Result<i64> {
        self.engine.accumulated_total(customer_id).await
    }

    /// Number of customer keys with buffered join state
    pub fn buffered_join_keys(&self) -> usize {
        self.joiner.buffered_keys()
    }
}

/// The assembled pipeline: one worker per partition plus shared wiring
pub struct PurchaseTopology<S, C, K>
where
    S: PurchaseSource,
    C: RecordCodec,
    K: RecordSink,
{
    workers: Vec<PartitionWorker<S, C, K>>,
    partitioner: RewardPartitioner,
    stats: Arc<TopologyStats>,
}

impl<S, C, K> PurchaseTopology<S, C, K>
where
    S: PurchaseSource + 'static,
    C: RecordCodec + Clone + 'static,
    K: RecordSink + Clone + 'static,
{
    /// Build the topology, failing fast on configuration problems
    ///
    /// The co-partitioning check runs here: the partition count the
    /// reward state is sharded by must equal the source's.
    pub fn new(
        config: &PipelineConfig,
        source: Arc<S>,
        codec: C,
        sink: K,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ProcessorError::Configuration(e.to_string()))?;
        verify_co_partitioning(config.partition_count, source.partition_count())?;

        let partitioner = RewardPartitioner::new(config.partition_count)?;
        let topics = &config.topics;
        let mux = Arc::new(SinkMultiplexer::new(
            codec.clone(),
            sink,
            [
                topics.patterns.clone(),
                topics.rewards.clone(),
                topics.coffee.clone(),
                topics.electronics.clone(),
                topics.correlated.clone(),
                topics.purchase_masked.clone(),
            ],
        ));
        let stats = Arc::new(TopologyStats::new());

        let workers = (0..config.partition_count)
            .map(|partition| {
                let store = ChangelogStore::new(MemoryStore::new());
                PartitionWorker {
                    partition,
                    source: source.clone(),
                    codec: codec.clone(),
                    mux: mux.clone(),
                    engine: RewardEngine::new(store, partition),
                    router: DepartmentRouter::coffee_and_electronics(),
                    joiner: CorrelationJoiner::new(config.join.window_width_ms),
                    audit: AuditStage::new(audit_sink.clone(), &config.audit),
                    extractor: PurchaseTimeExtractor,
                    topics: config.topics.clone(),
                    high_value_threshold: config.high_value_threshold,
                    stats: stats.clone(),
                }
            })
            .collect();

        info!(
            partitions = config.partition_count,
            "purchase topology built"
        );
        Ok(Self {
            workers,
            partitioner,
            stats,
        })
    }

    /// Reward-key partitioner, for producers keying the source log
    pub fn partitioner(&self) -> RewardPartitioner {
        self.partitioner
    }

    pub fn stats(&self) -> &TopologyStats {
        &self.stats
    }

    pub fn workers(&self) -> &[PartitionWorker<S, C, K>] {
        &self.workers
    }

    pub fn workers_mut(&mut self) -> &mut [PartitionWorker<S, C, K>] {
        &mut self.workers
    }

    /// Drain every partition in order; used by batch runs and tests
    pub async fn drain(&mut self) -> Result<u64> {
        let mut total = 0;
        for worker in &mut self.workers {
            total += worker.drain().await?;
        }
        Ok(total)
    }

    /// Spawn one task per partition, returning their handles
    ///
    /// Consumes the topology; each worker moves into its own task so the
    /// per-partition single-writer discipline holds by construction.
    pub fn spawn(self, stop: Arc<AtomicBool>) -> Vec<JoinHandle<Result<()>>>
    where
        S: Send + Sync,
        C: Send + Sync,
        K: Send + Sync,
    {
        self.workers
            .into_iter()
            .map(|mut worker| {
                let stop = stop.clone();
                tokio::spawn(async move { worker.run(stop).await })
            })
            .collect()
    }
}
