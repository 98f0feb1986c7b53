//! Stream processor for the retail purchase pipeline
//!
//! Consumes an ordered, partitioned log of purchase events and derives
//! six output streams from it:
//!
//! - a privacy-masked copy of every purchase
//! - a spending-pattern projection
//! - a per-customer accumulating reward ledger (stateful, co-partitioned
//!   with its changelog)
//! - coffee and electronics department branches
//! - a windowed correlation of coffee and electronics purchases by the
//!   same customer
//! - a high-value export re-keyed to the purchase event time
//!
//! Purchases by the audited employee are additionally persisted, raw and
//! unmasked, through the audit sink.
//!
//! # Architecture
//!
//! Each source partition is owned by exactly one [`topology::PartitionWorker`];
//! the worker runs the whole dataflow for its records in order and commits
//! the source offset only after the reward state write. Workers share
//! nothing but the source handle, the sink multiplexer and the stats, so
//! the per-record path takes no locks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use retail_config::PipelineConfig;
//! use retail_processor::codec::BincodeCodec;
//! use retail_processor::log::InMemoryLog;
//! use retail_processor::sink::CollectingSink;
//! use retail_processor::audit::RecordingAuditSink;
//! use retail_processor::topology::PurchaseTopology;
//!
//! # async fn build() -> retail_processor::error::Result<()> {
//! let config = PipelineConfig::default();
//! let source = Arc::new(InMemoryLog::new(config.partition_count));
//! let sink = Arc::new(CollectingSink::new());
//! let audit = Arc::new(RecordingAuditSink::new());
//!
//! let mut topology =
//!     PurchaseTopology::new(&config, source, BincodeCodec, sink, audit)?;
//! topology.drain().await?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod codec;
pub mod core;
pub mod error;
pub mod join;
pub mod log;
pub mod partition;
pub mod rewards;
pub mod router;
pub mod sink;
pub mod state;
pub mod topology;
pub mod transform;

pub use audit::{AuditSink, AuditStage};
pub use codec::{BincodeCodec, JsonCodec, RecordCodec};
pub use crate::core::{EventTimeExtractor, PurchaseTimeExtractor};
pub use error::{ProcessorError, Result};
pub use join::{CorrelationJoiner, JoinSide};
pub use log::{InMemoryLog, PurchaseSource, SourceRecord};
pub use partition::{verify_co_partitioning, RewardPartitioner};
pub use rewards::RewardEngine;
pub use router::{Branch, DepartmentRouter};
pub use sink::{CollectingSink, RecordSink, SinkKey, SinkMultiplexer};
pub use state::{ChangelogSnapshot, ChangelogStore, KeyValueStore, MemoryStore};
pub use topology::{PartitionWorker, PurchaseTopology, TopologyStats};
