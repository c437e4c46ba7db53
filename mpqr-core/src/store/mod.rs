//! Persistence seam for local transactions.
//!
//! Both write operations are conditional so that two processes sharing a
//! database cannot both create a QR order or both settle a transaction.

mod memory;
mod postgres;

pub use memory::MemoryTransactionStore;
pub use postgres::PgTransactionStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::payment_transaction::{NewPaymentTransaction, PaymentTransaction, Settlement};
use crate::qr_order::QrOrder;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("duplicate reference: {0}")]
    DuplicateReference(String),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<PaymentTransaction>, StoreError>;

    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError>;

    /// Write all QR fields of a pending transaction together.
    ///
    /// Applies only while the stored remote order id equals
    /// `previous_order_id`. Returns whether the write happened.
    async fn replace_qr_order(
        &self,
        id: Uuid,
        previous_order_id: Option<&str>,
        order: &QrOrder,
    ) -> Result<bool, StoreError>;

    /// Apply a terminal state to a pending transaction.
    ///
    /// Returns `true` only for the call that performed the transition.
    async fn settle(&self, id: Uuid, settlement: Settlement) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: TransactionStore + ?Sized> TransactionStore for std::sync::Arc<T> {
    async fn insert(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, StoreError> {
        (**self).insert(transaction).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentTransaction>, StoreError> {
        (**self).get(id).await
    }

    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        (**self).get_by_reference(reference).await
    }

    async fn replace_qr_order(
        &self,
        id: Uuid,
        previous_order_id: Option<&str>,
        order: &QrOrder,
    ) -> Result<bool, StoreError> {
        (**self).replace_qr_order(id, previous_order_id, order).await
    }

    async fn settle(&self, id: Uuid, settlement: Settlement) -> Result<bool, StoreError> {
        (**self).settle(id, settlement).await
    }
}
