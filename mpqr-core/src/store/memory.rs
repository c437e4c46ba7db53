use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, TransactionStore};
use crate::entities::TransactionState;
use crate::entities::payment_transaction::{NewPaymentTransaction, PaymentTransaction, Settlement};
use crate::qr_order::QrOrder;

/// In-process [`TransactionStore`].
///
/// Clones share the same map, so several lifecycle managers can be pointed
/// at one store the way several processes share one database.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransactionStore {
    transactions: Arc<Mutex<HashMap<Uuid, PaymentTransaction>>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PaymentTransaction>> {
        self.transactions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, StoreError> {
        let mut transactions = self.lock();
        if transactions
            .values()
            .any(|existing| existing.reference == transaction.reference)
        {
            return Err(StoreError::DuplicateReference(transaction.reference));
        }
        let now = OffsetDateTime::now_utc();
        let record = PaymentTransaction {
            id: transaction.id,
            reference: transaction.reference,
            description: transaction.description,
            amount: transaction.amount,
            currency: transaction.currency,
            state: TransactionState::Pending,
            state_message: None,
            payment_id: None,
            qr_data: None,
            qr_image: None,
            qr_order_id: None,
            qr_created_at: None,
            qr_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        transactions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self
            .lock()
            .values()
            .find(|transaction| transaction.reference == reference)
            .cloned())
    }

    async fn replace_qr_order(
        &self,
        id: Uuid,
        previous_order_id: Option<&str>,
        order: &QrOrder,
    ) -> Result<bool, StoreError> {
        let mut transactions = self.lock();
        let Some(record) = transactions.get_mut(&id) else {
            return Ok(false);
        };
        if record.state.is_terminal() || record.qr_order_id.as_deref() != previous_order_id {
            return Ok(false);
        }
        record.qr_data = Some(order.qr_payload.clone());
        record.qr_image = order.qr_image.clone();
        record.qr_order_id = Some(order.remote_order_id.clone());
        record.qr_created_at = Some(order.created_at);
        record.qr_expires_at = Some(order.expires_at);
        record.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn settle(&self, id: Uuid, settlement: Settlement) -> Result<bool, StoreError> {
        let mut transactions = self.lock();
        let Some(record) = transactions.get_mut(&id) else {
            return Ok(false);
        };
        if record.state.is_terminal() {
            return Ok(false);
        }
        record.state = settlement.state;
        record.state_message = settlement.state_message;
        record.payment_id = settlement.payment_id;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_transaction(reference: &str) -> NewPaymentTransaction {
        NewPaymentTransaction {
            id: Uuid::now_v7(),
            reference: reference.into(),
            description: None,
            amount: Decimal::new(1000, 2),
            currency: "ARS".into(),
        }
    }

    fn order(remote_order_id: &str) -> QrOrder {
        let created_at = OffsetDateTime::now_utc();
        QrOrder {
            reference: "SO042".into(),
            remote_order_id: remote_order_id.into(),
            qr_payload: format!("qr-{remote_order_id}"),
            qr_image: None,
            created_at,
            expires_at: QrOrder::expiry_for(created_at),
            amount: Decimal::new(1000, 2),
            currency: "ARS".into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_rejected() {
        let store = MemoryTransactionStore::new();
        store.insert(new_transaction("SO042")).await.unwrap();
        let err = store.insert(new_transaction("SO042")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReference(reference) if reference == "SO042"));
    }

    #[tokio::test]
    async fn test_replace_qr_order_compares_previous_id() {
        let store = MemoryTransactionStore::new();
        let tx = store.insert(new_transaction("SO042")).await.unwrap();

        assert!(store.replace_qr_order(tx.id, None, &order("a")).await.unwrap());
        // A writer still holding the empty view loses.
        assert!(!store.replace_qr_order(tx.id, None, &order("b")).await.unwrap());
        assert!(store.replace_qr_order(tx.id, Some("a"), &order("c")).await.unwrap());

        let stored = store.get(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.qr_order_id.as_deref(), Some("c"));
        assert_eq!(stored.qr_data.as_deref(), Some("qr-c"));
    }

    #[tokio::test]
    async fn test_settle_only_once() {
        let store = MemoryTransactionStore::new();
        let tx = store.insert(new_transaction("SO042")).await.unwrap();
        let done = Settlement {
            state: TransactionState::Done,
            state_message: None,
            payment_id: Some(1),
        };
        assert!(store.settle(tx.id, done.clone()).await.unwrap());
        assert!(!store.settle(tx.id, done).await.unwrap());

        let cancelled = Settlement {
            state: TransactionState::Cancelled,
            state_message: Some("cc_rejected_other_reason".into()),
            payment_id: None,
        };
        assert!(!store.settle(tx.id, cancelled).await.unwrap());
        let stored = store.get(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TransactionState::Done);
        assert_eq!(stored.payment_id, Some(1));
    }
}
