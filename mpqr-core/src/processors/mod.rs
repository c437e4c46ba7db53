//! Background processors.
//!
//! - `SettlementNotifier`: Receives `SettlementEvent`, delivers signed
//!   notifications downstream

pub mod settlement_notifier;

pub use settlement_notifier::SettlementNotifier;
