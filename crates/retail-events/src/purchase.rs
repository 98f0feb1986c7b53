//! The raw purchase event and its privacy-masked form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed prefix applied to a masked credit card number
pub const CREDIT_CARD_MASK: &str = "**** **** **** ";

/// A single retail purchase event as read from the source log
///
/// Purchases are immutable once emitted by the source; the only transform
/// that touches the card number is [`Purchase::masked`], which returns a
/// new value and leaves the original untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Customer identifier assigned by the upstream system
    pub customer_id: String,
    /// Identifier of the employee who rang up the sale
    pub employee_id: String,
    /// Customer first name
    pub first_name: String,
    /// Customer last name
    pub last_name: String,
    /// Raw credit card number; masked before any downstream emission
    pub credit_card_number: String,
    /// Store zip code
    pub zip_code: String,
    /// Item description
    pub item_purchased: String,
    /// Department label, e.g. "coffee" or "electronics"
    pub department: String,
    /// When the purchase occurred; absent in malformed feeds, in which
    /// case the log ingestion timestamp is used for event time
    pub purchase_date: Option<DateTime<Utc>>,
    /// Unit price
    pub price: f64,
    /// Number of units
    pub quantity: i32,
}

impl Purchase {
    /// Total value of the purchase (price × quantity)
    pub fn total(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// The re-keyed customer identity used for reward accumulation and
    /// the department join: `"first_name,last_name"`
    pub fn reward_customer_id(&self) -> String {
        format!("{},{}", self.first_name, self.last_name)
    }

    /// Produce a new purchase with the credit card number replaced by the
    /// fixed mask plus the last four characters of the original
    ///
    /// If the original has fewer than four characters the mask still
    /// applies, using as many characters as are available. Every other
    /// field is preserved exactly.
    pub fn masked(&self) -> Purchase {
        let count = self.credit_card_number.chars().count();
        let tail: String = self
            .credit_card_number
            .chars()
            .skip(count.saturating_sub(4))
            .collect();

        Purchase {
            credit_card_number: format!("{}{}", CREDIT_CARD_MASK, tail),
            ..self.clone()
        }
    }
}
