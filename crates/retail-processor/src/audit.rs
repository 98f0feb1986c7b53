//! Audit capture for flagged employee purchases
//!
//! Purchases made by the audited employee id are persisted through an
//! [`AuditSink`] before the pipeline moves on. The save is synchronous
//! with respect to record processing and retried with exponential
//! backoff; exhausting the retries fails the record. The audit copy is
//! always the original, unmasked purchase.

use crate::error::{ProcessorError, Result};
use async_trait::async_trait;
use retail_config::AuditConfig;
use retail_events::Purchase;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for audit copies of flagged purchases
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one purchase, returning a reason string on failure
    async fn save(&self, purchase: &Purchase) -> std::result::Result<(), String>;
}

/// Filters purchases by employee id and persists matches with retry
pub struct AuditStage {
    sink: Arc<dyn AuditSink>,
    employee_id: String,
    max_retries: u32,
    base_backoff: Duration,
}

impl AuditStage {
    pub fn new(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Self {
        Self {
            sink,
            employee_id: config.employee_id.clone(),
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
        }
    }

    /// Employee id this stage filters on
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    /// Inspect one purchase, saving it when the employee id matches
    ///
    /// Non-matching purchases pass through untouched. For matches, the
    /// save is attempted up to `max_retries` times with doubling
    /// backoff; the record does not advance until the save succeeds.
    pub async fn inspect(&self, purchase: &Purchase) -> Result<()> {
        if purchase.employee_id != self.employee_id {
            return Ok(());
        }

        let mut backoff = self.base_backoff;
        let mut last_reason = String::new();

        // At least one attempt regardless of the configured budget; a
        // matching purchase must never be dropped without calling the sink
        let max_attempts = self.max_retries.max(1);

        for attempt in 1..=max_attempts {
            match self.sink.save(purchase).await {
                Ok(()) => {
                    debug!(
                        employee_id = %purchase.employee_id,
                        customer_id = %purchase.customer_id,
                        attempt,
                        "audit save complete"
                    );
                    return Ok(());
                }
                Err(reason) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        %reason,
                        "audit save failed, retrying"
                    );
                    last_reason = reason;
                    if attempt < max_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2);
                    }
                }
            }
        }

        Err(ProcessorError::AuditExhausted {
            attempts: max_attempts,
            reason: last_reason,
        })
    }
}

/// In-memory audit sink that records every saved purchase
#[derive(Default)]
pub struct RecordingAuditSink {
    saved: tokio::sync::Mutex<Vec<Purchase>>,
    fail_first: std::sync::atomic::AtomicU32,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` save attempts before succeeding
    pub fn fail_next(count: u32) -> Self {
        Self {
            saved: tokio::sync::Mutex::new(Vec::new()),
            fail_first: std::sync::atomic::AtomicU32::new(count),
        }
    }

    pub async fn saved(&self) -> Vec<Purchase> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn save(&self, purchase: &Purchase) -> std::result::Result<(), String> {
        use std::sync::atomic::Ordering;

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(format!("injected failure, {} remaining", remaining - 1));
        }

        self.saved.lock().await.push(purchase.clone());
        Ok(())
    }
}
