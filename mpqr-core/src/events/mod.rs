//! Settlement events.
//!
//! The lifecycle manager emits one `SettlementEvent` per applied terminal
//! transition; the `SettlementNotifier` consumes them and delivers them
//! downstream. Events are ephemeral and carry a snapshot of the settled
//! transaction.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, SettlementEventReceiver, SettlementEventSender,
    settlement_event_channel,
};

pub use types::SettlementEvent;
