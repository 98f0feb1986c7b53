//! Records derived from purchases by the pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::purchase::Purchase;

/// Spending-pattern projection of a purchase
///
/// Stateless and one-to-one with each purchase; carries no customer
/// identity beyond the store zip code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePattern {
    /// Store zip code
    pub zip_code: String,
    /// Item description
    pub item: String,
    /// When the purchase occurred
    pub date: Option<DateTime<Utc>>,
    /// Total amount: price × quantity, no rounding
    pub amount: f64,
}

impl PurchasePattern {
    /// Project a pattern record from a purchase
    pub fn from_purchase(purchase: &Purchase) -> Self {
        Self {
            zip_code: purchase.zip_code.clone(),
            item: purchase.item_purchased.clone(),
            date: purchase.purchase_date,
            amount: purchase.total(),
        }
    }
}

/// Per-customer reward ledger entry
///
/// `current_reward_points` is the contribution of one purchase;
/// `total_reward_points` is the running sum across all purchases for the
/// same customer, filled in by the reward engine from its state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardAccumulator {
    /// Derived customer identity: `"first_name,last_name"`
    pub customer_id: String,
    /// Total value of this purchase (price × quantity)
    pub purchase_total: f64,
    /// Running reward total across all of this customer's purchases
    pub total_reward_points: i64,
    /// Points earned by this purchase alone: floor(price × quantity)
    pub current_reward_points: i64,
    /// Always 0; the original system never tracked last-purchase time
    pub days_from_last_purchase: i64,
}

impl RewardAccumulator {
    /// Derive a reward record from a purchase
    ///
    /// At construction the running total equals this purchase's points;
    /// the engine adds the previously accumulated balance afterwards.
    pub fn from_purchase(purchase: &Purchase) -> Self {
        let points = purchase.total().floor() as i64;
        Self {
            customer_id: purchase.reward_customer_id(),
            purchase_total: purchase.total(),
            total_reward_points: points,
            current_reward_points: points,
            days_from_last_purchase: 0,
        }
    }

    /// Fold previously accumulated points into the running total
    pub fn add_accumulated(&mut self, accumulated: i64) {
        self.total_reward_points = self.current_reward_points + accumulated;
    }
}

/// A coffee purchase and an electronics purchase by the same customer
/// within the correlation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPurchase {
    /// The shared join key (`"first_name,last_name"`)
    pub customer_id: String,
    /// The coffee-department purchase (masked)
    pub coffee_purchase: Purchase,
    /// The electronics-department purchase (masked)
    pub electronics_purchase: Purchase,
    /// Event timestamp of the coffee purchase, epoch millis
    pub coffee_timestamp_ms: i64,
    /// Event timestamp of the electronics purchase, epoch millis
    pub electronics_timestamp_ms: i64,
}

impl CorrelatedPurchase {
    /// Combined value of both purchases
    pub fn total_amount(&self) -> f64 {
        self.coffee_purchase.total() + self.electronics_purchase.total()
    }
}
