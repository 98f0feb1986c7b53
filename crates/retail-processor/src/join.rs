//! Windowed correlation join between the coffee and electronics branches
//!
//! An explicit sliding-window inner join: each side keeps a bounded
//! time-indexed buffer per key, pruned as stream time advances. A new
//! arrival probes the opposite side's buffer for every entry within the
//! window width, emits one correlated pair per match, then enters its
//! own buffer. Both arrival orders match; there is no grace period, so
//! an arrival older than the window boundary at arrival time is dropped
//! unmatched.

use retail_events::{CorrelatedPurchase, Purchase};
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};

/// Which branch an event arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Coffee,
    Electronics,
}

/// Per-key join state: one time-indexed buffer per side
#[derive(Debug, Default)]
struct JoinState {
    coffee: BTreeMap<i64, Vec<Purchase>>,
    electronics: BTreeMap<i64, Vec<Purchase>>,
}

impl JoinState {
    fn side_mut(&mut self, side: JoinSide) -> &mut BTreeMap<i64, Vec<Purchase>> {
        match side {
            JoinSide::Coffee => &mut self.coffee,
            JoinSide::Electronics => &mut self.electronics,
        }
    }

    fn prune(&mut self, horizon: i64) {
        self.coffee = self.coffee.split_off(&horizon);
        self.electronics = self.electronics.split_off(&horizon);
    }

    fn is_empty(&self) -> bool {
        self.coffee.is_empty() && self.electronics.is_empty()
    }
}

/// Symmetric sliding-window inner join keyed by customer
///
/// One joiner instance per partition; the per-partition worker is the
/// only caller, so no internal synchronization is needed.
pub struct CorrelationJoiner {
    window_width_ms: i64,
    stream_time_ms: i64,
    state: HashMap<String, JoinState>,
    late_drops: u64,
}

impl CorrelationJoiner {
    /// Create a joiner with the given symmetric window width
    pub fn new(window_width_ms: u64) -> Self {
        Self {
            window_width_ms: window_width_ms as i64,
            stream_time_ms: i64::MIN,
            state: HashMap::new(),
            late_drops: 0,
        }
    }

    /// Process one branch arrival and return every qualifying pair
    ///
    /// A pair qualifies when both events share `key` and their event
    /// timestamps differ by at most the window width. Each qualifying
    /// pair is emitted exactly once: the probe only sees entries that
    /// arrived earlier, and the new event is inserted after probing.
    pub fn process(
        &mut self,
        side: JoinSide,
        key: &str,
        purchase: &Purchase,
        timestamp_ms: i64,
    ) -> Vec<CorrelatedPurchase> {
        self.stream_time_ms = self.stream_time_ms.max(timestamp_ms);
        let horizon = self.stream_time_ms.saturating_sub(self.window_width_ms);

        // No grace: anything older than the boundary at arrival time is
        // out, matched or not.
        if timestamp_ms < horizon {
            warn!(
                key,
                timestamp_ms,
                horizon,
                "late event outside join window, dropping"
            );
            self.late_drops += 1;
            return Vec::new();
        }

        let state = self.state.entry(key.to_string()).or_default();
        state.prune(horizon);

        let lower = timestamp_ms.saturating_sub(self.window_width_ms);
        let upper = timestamp_ms.saturating_add(self.window_width_ms);

        let mut pairs = Vec::new();
        let opposite = match side {
            JoinSide::Coffee => &state.electronics,
            JoinSide::Electronics => &state.coffee,
        };

        for (&other_ts, others) in opposite.range(lower..=upper) {
            for other in others {
                let pair = match side {
                    JoinSide::Coffee => CorrelatedPurchase {
                        customer_id: key.to_string(),
                        coffee_purchase: purchase.clone(),
                        electronics_purchase: other.clone(),
                        coffee_timestamp_ms: timestamp_ms,
                        electronics_timestamp_ms: other_ts,
                    },
                    JoinSide::Electronics => CorrelatedPurchase {
                        customer_id: key.to_string(),
                        coffee_purchase: other.clone(),
                        electronics_purchase: purchase.clone(),
                        coffee_timestamp_ms: other_ts,
                        electronics_timestamp_ms: timestamp_ms,
                    },
                };
                pairs.push(pair);
            }
        }

        state
            .side_mut(side)
            .entry(timestamp_ms)
            .or_default()
            .push(purchase.clone());

        trace!(
            key,
            timestamp_ms,
            matches = pairs.len(),
            "join probe complete"
        );
        pairs
    }

    /// Drop buffered state for keys whose entries have all expired
    pub fn evict_empty_keys(&mut self) {
        let horizon = self.stream_time_ms.saturating_sub(self.window_width_ms);
        self.state.retain(|_, state| {
            state.prune(horizon);
            !state.is_empty()
        });
    }

    /// Number of events dropped for arriving outside the window
    pub fn late_drops(&self) -> u64 {
        self.late_drops
    }

    /// Number of keys with buffered state
    pub fn buffered_keys(&self) -> usize {
        self.state.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const MINUTE_MS: i64 = 60_000;
    const WINDOW_MS: u64 = 20 * 60_000;

    fn purchase_in(department: &str) -> Purchase {
        Purchase {
            customer_id: "C1".to_string(),
            employee_id: "E200".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            credit_card_number: "**** **** **** 1234".to_string(),
            zip_code: "47514".to_string(),
            item_purchased: "widget".to_string(),
            department: department.to_string(),
            purchase_date: Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
            price: 5.0,
            quantity: 1,
        }
    }

    #[test]
    fn test_pair_within_window() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        let none = joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        assert!(none.is_empty());

        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            10 * MINUTE_MS,
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].coffee_timestamp_ms, 0);
        assert_eq!(pairs[0].electronics_timestamp_ms, 10 * MINUTE_MS);
        assert_eq!(pairs[0].coffee_purchase.department, "coffee");
        assert_eq!(pairs[0].electronics_purchase.department, "electronics");
    }

    #[test]
    fn test_either_arrival_order_matches() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            0,
        );
        let pairs = joiner.process(
            JoinSide::Coffee,
            "Ada,Lovelace",
            &purchase_in("coffee"),
            5 * MINUTE_MS,
        );

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].coffee_timestamp_ms, 5 * MINUTE_MS);
        assert_eq!(pairs[0].electronics_timestamp_ms, 0);
    }

    #[test]
    fn test_exact_window_boundary_matches() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            WINDOW_MS as i64,
        );
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_beyond_window_no_match() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            WINDOW_MS as i64 + 1,
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_different_keys_never_match() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Grace,Hopper",
            &purchase_in("electronics"),
            MINUTE_MS,
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_multiple_matches_each_emit() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        joiner.process(
            JoinSide::Coffee,
            "Ada,Lovelace",
            &purchase_in("coffee"),
            MINUTE_MS,
        );

        // One electronics event inside both coffee windows: two pairs
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            2 * MINUTE_MS,
        );
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_each_pair_emitted_once() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        let first = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            MINUTE_MS,
        );
        assert_eq!(first.len(), 1);

        // A later coffee event pairs with the electronics event only;
        // the (coffee@0, electronics@1m) pair is not re-emitted
        let second = joiner.process(
            JoinSide::Coffee,
            "Ada,Lovelace",
            &purchase_in("coffee"),
            2 * MINUTE_MS,
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].coffee_timestamp_ms, 2 * MINUTE_MS);
    }

    #[test]
    fn test_late_event_dropped_unmatched() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        // Advance stream time well past the window
        joiner.process(
            JoinSide::Coffee,
            "Ada,Lovelace",
            &purchase_in("coffee"),
            60 * MINUTE_MS,
        );

        // This event is older than stream_time - W at arrival
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            10 * MINUTE_MS,
        );
        assert!(pairs.is_empty());
        assert_eq!(joiner.late_drops(), 1);
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);

        // Advance stream time so the buffered coffee event expires
        joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            41 * MINUTE_MS,
        );

        // A probe that would have matched the expired event finds nothing
        let pairs = joiner.process(
            JoinSide::Electronics,
            "Ada,Lovelace",
            &purchase_in("electronics"),
            21 * MINUTE_MS + 1,
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_evict_empty_keys() {
        let mut joiner = CorrelationJoiner::new(WINDOW_MS);

        joiner.process(JoinSide::Coffee, "Ada,Lovelace", &purchase_in("coffee"), 0);
        assert_eq!(joiner.buffered_keys(), 1);

        joiner.process(
            JoinSide::Coffee,
            "Grace,Hopper",
            &purchase_in("coffee"),
            60 * MINUTE_MS,
        );
        joiner.evict_empty_keys();

        // Ada's entry expired; Grace's is live
        assert_eq!(joiner.buffered_keys(), 1);
    }
}
