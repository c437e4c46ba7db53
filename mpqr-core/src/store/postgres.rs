use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, TransactionStore};
use crate::entities::payment_transaction::{
    GetPaymentTransaction, GetPaymentTransactionByReference, InsertPaymentTransaction,
    NewPaymentTransaction, PaymentTransaction, ReplaceQrOrder, SettlePaymentTransaction,
    Settlement,
};
use crate::framework::DatabaseProcessor;
use crate::qr_order::QrOrder;

/// [`TransactionStore`] backed by the `payment_transactions` table.
#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    processor: DatabaseProcessor,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
        }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn insert(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, StoreError> {
        let reference = transaction.reference.clone();
        self.processor
            .process(InsertPaymentTransaction { transaction })
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicateReference(reference)
                }
                other => StoreError::Database(other),
            })
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self.processor.process(GetPaymentTransaction { id }).await?)
    }

    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self
            .processor
            .process(GetPaymentTransactionByReference {
                reference: reference.to_owned(),
            })
            .await?)
    }

    async fn replace_qr_order(
        &self,
        id: Uuid,
        previous_order_id: Option<&str>,
        order: &QrOrder,
    ) -> Result<bool, StoreError> {
        Ok(self
            .processor
            .process(ReplaceQrOrder {
                id,
                previous_order_id: previous_order_id.map(str::to_owned),
                order: order.clone(),
            })
            .await?)
    }

    async fn settle(&self, id: Uuid, settlement: Settlement) -> Result<bool, StoreError> {
        Ok(self
            .processor
            .process(SettlePaymentTransaction { id, settlement })
            .await?)
    }
}
