//! Key-value state for the reward accumulation engine
//!
//! The engine owns one store handle per partition. `MemoryStore` is the
//! local working copy; `ChangelogStore` wraps it and records every write
//! so the working copy can be rebuilt after a restart or partition
//! reassignment.

pub mod changelog;
pub mod memory;
pub mod store;

pub use changelog::{ChangelogStore, ChangelogSnapshot};
pub use memory::{MemoryStore, StoreStats};
pub use store::KeyValueStore;
