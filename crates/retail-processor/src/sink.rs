//! Outbound record delivery
//!
//! Every derived stream leaves the pipeline through the
//! [`SinkMultiplexer`], which encodes values with the configured codec
//! and hands the bytes to a [`RecordSink`] keyed by channel name. The
//! multiplexer only accepts channels it was registered with, so a
//! misrouted emission surfaces as an error instead of a silent write.

use crate::codec::RecordCodec;
use crate::error::{Result, SinkError, SinkResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// Record key carried alongside an outbound payload
///
/// Most streams keep their string key; the high-value export re-keys
/// records to the purchase event time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SinkKey {
    Text(String),
    EpochMillis(i64),
}

impl SinkKey {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for SinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::EpochMillis(ms) => write!(f, "{}", ms),
        }
    }
}

/// Transport-side delivery of encoded records
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn send(&self, channel: &str, key: SinkKey, payload: Vec<u8>) -> SinkResult<()>;
}

/// Encodes values and routes them to registered output channels
pub struct SinkMultiplexer<C: RecordCodec, S: RecordSink> {
    codec: C,
    sink: S,
    channels: HashSet<String>,
}

impl<C: RecordCodec, S: RecordSink> SinkMultiplexer<C, S> {
    pub fn new(codec: C, sink: S, channels: impl IntoIterator<Item = String>) -> Self {
        Self {
            codec,
            sink,
            channels: channels.into_iter().collect(),
        }
    }

    /// Encode `value` and deliver it on `channel`
    pub async fn emit<T: Serialize + Sync>(
        &self,
        channel: &str,
        key: SinkKey,
        value: &T,
    ) -> Result<()> {
        if !self.channels.contains(channel) {
            return Err(SinkError::UnknownChannel {
                channel: channel.to_string(),
            }
            .into());
        }

        let payload = self.codec.encode(value)?;
        trace!(channel, %key, bytes = payload.len(), "emitting record");
        self.sink.send(channel, key, payload).await?;
        Ok(())
    }

    pub fn channels(&self) -> &HashSet<String> {
        &self.channels
    }
}

/// In-memory sink that collects every delivered record per channel
#[derive(Default)]
pub struct CollectingSink {
    records: dashmap::DashMap<String, Vec<(SinkKey, Vec<u8>)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records delivered on `channel`, in delivery order
    pub fn records(&self, channel: &str) -> Vec<(SinkKey, Vec<u8>)> {
        self.records
            .get(channel)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, channel: &str) -> usize {
        self.records.get(channel).map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RecordSink for CollectingSink {
    async fn send(&self, channel: &str, key: SinkKey, payload: Vec<u8>) -> SinkResult<()> {
        self.records
            .entry(channel.to_string())
            .or_default()
            .push((key, payload));
        Ok(())
    }
}

#[async_trait]
impl<T: RecordSink + ?Sized> RecordSink for std::sync::Arc<T> {
    async fn send(&self, channel: &str, key: SinkKey, payload: Vec<u8>) -> SinkResult<()> {
        (**self).send(channel, key, payload).await
    }
}
