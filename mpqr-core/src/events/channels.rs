//! Event channel factories and handles.

use super::types::SettlementEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for SettlementEvent events.
pub type SettlementEventSender = mpsc::Sender<SettlementEvent>;
/// Receiver handle for SettlementEvent events.
pub type SettlementEventReceiver = mpsc::Receiver<SettlementEvent>;

/// Create a new SettlementEvent channel.
///
/// Returns a (sender, receiver) pair. Multiple senders can be cloned from
/// the returned sender.
pub fn settlement_event_channel() -> (SettlementEventSender, SettlementEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
