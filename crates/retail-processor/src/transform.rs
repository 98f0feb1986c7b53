//! Stateless per-record transforms
//!
//! The masking stage, the spending-pattern projection and the high-value
//! predicate. Each is a pure function of one purchase; the topology
//! decides where the results go.

use retail_events::{Purchase, PurchasePattern};
use tracing::trace;

/// Produce the privacy-masked copy of a purchase
///
/// Only the credit card number changes; downstream consumers that need
/// the raw number (the audit store) take the original instead.
pub fn mask_purchase(purchase: &Purchase) -> Purchase {
    let masked = purchase.masked();
    trace!(customer_id = %purchase.customer_id, "masked purchase");
    masked
}

/// Project a purchase onto its spending-pattern view
pub fn project_pattern(purchase: &Purchase) -> PurchasePattern {
    PurchasePattern::from_purchase(purchase)
}

/// Whether a purchase qualifies for the high-value export
///
/// Strictly greater than the threshold; a purchase priced exactly at the
/// threshold does not qualify.
pub fn is_high_value(purchase: &Purchase, threshold: f64) -> bool {
    purchase.price > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn purchase(price: f64) -> Purchase {
        Purchase {
            customer_id: "C1".to_string(),
            employee_id: "E200".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            credit_card_number: "4111 1111 1111 1234".to_string(),
            zip_code: "47514".to_string(),
            item_purchased: "headphones".to_string(),
            department: "electronics".to_string(),
            purchase_date: Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
            price,
            quantity: 2,
        }
    }

    #[test]
    fn test_mask_changes_only_the_card_number() {
        let original = purchase(9.99);
        let masked = mask_purchase(&original);

        assert_eq!(masked.credit_card_number, "**** **** **** 1234");
        assert_eq!(masked.customer_id, original.customer_id);
        assert_eq!(masked.price, original.price);
        assert_eq!(original.credit_card_number, "4111 1111 1111 1234");
    }

    #[test]
    fn test_pattern_amount_is_price_times_quantity() {
        let pattern = project_pattern(&purchase(9.99));
        assert!((pattern.amount - 19.98).abs() < 1e-9);
        assert_eq!(pattern.zip_code, "47514");
    }

    #[test]
    fn test_high_value_threshold_is_strict() {
        assert!(!is_high_value(&purchase(20.0), 20.0));
        assert!(is_high_value(&purchase(20.01), 20.0));
        assert!(!is_high_value(&purchase(19.99), 20.0));
    }
}
