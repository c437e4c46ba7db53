//! Payload delivered downstream when a transaction settles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkout::TransactionState;

/// Event type carried by every settlement notification.
pub const SETTLEMENT_EVENT_TYPE: &str = "transaction_settled";

/// Body of the downstream settlement notification.
///
/// Signed with [`crate::signature::sign_body`] and sent with the
/// [`crate::signature::NOTIFICATION_SIGNATURE_HEADER`] header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementNotificationPayload {
    pub event_type: String,
    pub transaction_id: Uuid,
    pub reference: String,
    pub state: TransactionState,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_message: Option<String>,
    pub timestamp: i64,
}
