//! Domain record types for the retail purchase stream pipeline
//!
//! This crate defines the purchase event consumed from the source log and
//! the records derived from it by the pipeline stages. All transforms that
//! produce new values from a purchase (masking, pattern projection, reward
//! derivation) live here as pure constructors and methods.

pub mod derived;
pub mod purchase;

pub use derived::{CorrelatedPurchase, PurchasePattern, RewardAccumulator};
pub use purchase::{Purchase, CREDIT_CARD_MASK};
