//! Error types for the purchase pipeline
//!
//! Each concern gets its own error enum; `ProcessorError` lifts them into
//! a single type for the topology layer. Per-record failures (undecodable
//! input, a failed audit save) are isolated by the worker loop; state and
//! partitioning errors fail the record's processing attempt or, for the
//! co-partitioning check, startup itself.

use thiserror::Error;

/// Main pipeline error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// State store errors
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Sink emission errors
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Audit store call failed after exhausting retries
    #[error("audit save failed after {attempts} attempts: {reason}")]
    AuditExhausted { attempts: u32, reason: String },

    /// The rewards channel and the state changelog disagree on the
    /// partition function or count; fatal at startup
    #[error("co-partitioning violated: {reason}")]
    Partitioning { reason: String },

    /// Inbound record could not be decoded
    #[error("malformed record at partition {partition} offset {offset}: {reason}")]
    MalformedRecord {
        partition: u32,
        offset: u64,
        reason: String,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Source log errors
    #[error("source error: {0}")]
    Source(String),
}

/// State store operation errors
#[derive(Error, Debug)]
pub enum StateError {
    /// The backing store is unavailable; the record's attempt must fail
    /// rather than skip the accumulation
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Stored value could not be decoded
    #[error("state deserialization failed for key '{key}': {reason}")]
    DeserializationFailed { key: String, reason: String },

    /// Value could not be encoded for storage
    #[error("state serialization failed for key '{key}': {reason}")]
    SerializationFailed { key: String, reason: String },

    /// Changelog replay failed during restore
    #[error("restore failed from changelog: {reason}")]
    RestoreFailed { reason: String },

    /// Changelog append or persistence failed
    #[error("changelog error: {reason}")]
    Changelog { reason: String },
}

/// Output channel errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Named channel is not wired into the multiplexer
    #[error("unknown channel: {channel}")]
    UnknownChannel { channel: String },

    /// Transport-level send failure
    #[error("send failed on channel {channel}: {reason}")]
    SendFailed { channel: String, reason: String },
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Result type alias for state operations
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

impl From<bincode::Error> for ProcessorError {
    fn from(err: bincode::Error) -> Self {
        ProcessorError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ProcessorError {
    fn from(err: serde_json::Error) -> Self {
        ProcessorError::Serialization(err.to_string())
    }
}
