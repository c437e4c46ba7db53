use compact_str::CompactString;
use mpqr_sdk::objects::{SETTLEMENT_EVENT_TYPE, SettlementNotificationPayload};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::TransactionState;
use crate::entities::payment_transaction::PaymentTransaction;

/// A transaction reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub transaction_id: Uuid,
    pub reference: String,
    pub state: TransactionState,
    pub amount: Decimal,
    pub currency: CompactString,
    pub payment_id: Option<i64>,
    pub state_message: Option<String>,
    pub settled_at: OffsetDateTime,
}

impl SettlementEvent {
    pub fn from_transaction(transaction: &PaymentTransaction) -> Self {
        Self {
            transaction_id: transaction.id,
            reference: transaction.reference.clone(),
            state: transaction.state,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            payment_id: transaction.payment_id,
            state_message: transaction.state_message.clone(),
            settled_at: transaction.updated_at,
        }
    }

    pub fn to_payload(&self, timestamp: i64) -> SettlementNotificationPayload {
        SettlementNotificationPayload {
            event_type: SETTLEMENT_EVENT_TYPE.to_string(),
            transaction_id: self.transaction_id,
            reference: self.reference.clone(),
            state: self.state.into(),
            amount: self.amount,
            currency: self.currency.to_string(),
            payment_id: self.payment_id,
            state_message: self.state_message.clone(),
            timestamp,
        }
    }
}
