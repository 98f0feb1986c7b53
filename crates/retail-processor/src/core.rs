//! Event time extraction
//!
//! All time-based operations downstream (the correlation join, the
//! high-value re-key) use the timestamp produced here, not the log's
//! ingestion time, unless the purchase carries no usable date.

use retail_events::Purchase;

/// Trait for deriving the event timestamp of an inbound record
///
/// Implementations must be pure: no side effects, no blocking.
pub trait EventTimeExtractor<T> {
    /// Extract the event timestamp in epoch milliseconds, given the
    /// record and the log-provided ingestion timestamp
    fn extract(&self, event: &T, ingestion_ts_ms: i64) -> i64;
}

/// Default extractor for purchases
///
/// Uses `purchase_date` converted to epoch milliseconds; falls back to
/// the log-provided timestamp when the date is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseTimeExtractor;

impl EventTimeExtractor<Purchase> for PurchaseTimeExtractor {
    fn extract(&self, event: &Purchase, ingestion_ts_ms: i64) -> i64 {
        match event.purchase_date {
            Some(date) => date.timestamp_millis(),
            None => ingestion_ts_ms,
        }
    }
}
