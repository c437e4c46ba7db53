use crate::entities::TransactionState;
use crate::framework::DatabaseProcessor;
use crate::qr_order::QrOrder;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

const COLUMNS: &str = r#"
    id,
    reference,
    description,
    amount,
    currency,
    state,
    state_message,
    payment_id,
    qr_data,
    qr_image,
    qr_order_id,
    qr_created_at,
    qr_expires_at,
    created_at,
    updated_at
"#;

/// A local transaction paid through a provider QR.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub reference: String,
    /// Label shown on the provider order; the reference when absent.
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: CompactString,
    pub state: TransactionState,
    pub state_message: Option<String>,
    /// Provider payment that approved the transaction.
    pub payment_id: Option<i64>,
    pub qr_data: Option<String>,
    pub qr_image: Option<String>,
    pub qr_order_id: Option<String>,
    pub qr_created_at: Option<OffsetDateTime>,
    pub qr_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PaymentTransaction {
    /// The attached QR order, if one was ever created.
    pub fn qr_order(&self) -> Option<QrOrder> {
        match (
            &self.qr_order_id,
            &self.qr_data,
            self.qr_created_at,
            self.qr_expires_at,
        ) {
            (Some(remote_order_id), Some(qr_payload), Some(created_at), Some(expires_at)) => {
                Some(QrOrder {
                    reference: self.reference.clone(),
                    remote_order_id: remote_order_id.clone(),
                    qr_payload: qr_payload.clone(),
                    qr_image: self.qr_image.clone(),
                    created_at,
                    expires_at,
                    amount: self.amount,
                    currency: self.currency.clone(),
                })
            }
            _ => None,
        }
    }

    /// Title and description sent to the provider.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.reference)
    }
}

/// Data for inserting a new pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentTransaction {
    pub id: Uuid,
    pub reference: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: CompactString,
}

/// The terminal write applied by a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub state: TransactionState,
    pub state_message: Option<String>,
    pub payment_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct InsertPaymentTransaction {
    pub transaction: NewPaymentTransaction,
}

impl Processor<InsertPaymentTransaction> for DatabaseProcessor {
    type Output = PaymentTransaction;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPaymentTransaction")]
    async fn process(
        &self,
        insert: InsertPaymentTransaction,
    ) -> Result<PaymentTransaction, sqlx::Error> {
        let NewPaymentTransaction {
            id,
            reference,
            description,
            amount,
            currency,
        } = insert.transaction;
        let sql = format!(
            r#"
            INSERT INTO payment_transactions (id, reference, description, amount, currency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(id)
            .bind(reference)
            .bind(description)
            .bind(amount)
            .bind(currency.as_str())
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetPaymentTransaction {
    pub id: Uuid,
}

impl Processor<GetPaymentTransaction> for DatabaseProcessor {
    type Output = Option<PaymentTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentTransaction")]
    async fn process(
        &self,
        query: GetPaymentTransaction,
    ) -> Result<Option<PaymentTransaction>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM payment_transactions WHERE id = $1");
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetPaymentTransactionByReference {
    pub reference: String,
}

impl Processor<GetPaymentTransactionByReference> for DatabaseProcessor {
    type Output = Option<PaymentTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentTransactionByReference")]
    async fn process(
        &self,
        query: GetPaymentTransactionByReference,
    ) -> Result<Option<PaymentTransaction>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM payment_transactions WHERE reference = $1");
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(query.reference)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Replace all QR fields of a pending transaction at once.
///
/// Only applies while the stored `qr_order_id` still equals
/// `previous_order_id`, so a writer holding a stale view loses. Returns
/// whether the row was updated.
pub struct ReplaceQrOrder {
    pub id: Uuid,
    pub previous_order_id: Option<String>,
    pub order: QrOrder,
}

impl Processor<ReplaceQrOrder> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ReplaceQrOrder")]
    async fn process(&self, update: ReplaceQrOrder) -> Result<bool, sqlx::Error> {
        let ReplaceQrOrder {
            id,
            previous_order_id,
            order,
        } = update;
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET qr_data = $2,
                qr_image = $3,
                qr_order_id = $4,
                qr_created_at = $5,
                qr_expires_at = $6,
                updated_at = now()
            WHERE id = $1
              AND state = 'pending'
              AND qr_order_id IS NOT DISTINCT FROM $7
            "#,
        )
        .bind(id)
        .bind(order.qr_payload)
        .bind(order.qr_image)
        .bind(order.remote_order_id)
        .bind(order.created_at)
        .bind(order.expires_at)
        .bind(previous_order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Move a pending transaction to a terminal state.
///
/// Returns `false` when the transaction was already terminal, in which case
/// nothing is written.
pub struct SettlePaymentTransaction {
    pub id: Uuid,
    pub settlement: Settlement,
}

impl Processor<SettlePaymentTransaction> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SettlePaymentTransaction")]
    async fn process(&self, update: SettlePaymentTransaction) -> Result<bool, sqlx::Error> {
        let SettlePaymentTransaction { id, settlement } = update;
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET state = $2,
                state_message = $3,
                payment_id = $4,
                updated_at = now()
            WHERE id = $1 AND state = 'pending'
            "#,
        )
        .bind(id)
        .bind(settlement.state)
        .bind(settlement.state_message)
        .bind(settlement.payment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn transaction() -> PaymentTransaction {
        PaymentTransaction {
            id: Uuid::nil(),
            reference: "SO042".into(),
            description: None,
            amount: Decimal::new(2500, 2),
            currency: "ARS".into(),
            state: TransactionState::Pending,
            state_message: None,
            payment_id: None,
            qr_data: None,
            qr_image: None,
            qr_order_id: None,
            qr_created_at: None,
            qr_expires_at: None,
            created_at: datetime!(2025-01-01 12:00 UTC),
            updated_at: datetime!(2025-01-01 12:00 UTC),
        }
    }

    #[test]
    fn test_qr_order_requires_all_fields() {
        let mut tx = transaction();
        assert!(tx.qr_order().is_none());

        tx.qr_data = Some("000201".into());
        tx.qr_order_id = Some("abc".into());
        tx.qr_created_at = Some(datetime!(2025-01-01 12:00 UTC));
        assert!(tx.qr_order().is_none());

        tx.qr_expires_at = Some(datetime!(2025-01-01 12:15 UTC));
        let order = tx.qr_order().unwrap();
        assert_eq!(order.reference, "SO042");
        assert_eq!(order.remote_order_id, "abc");
        assert_eq!(order.amount, Decimal::new(2500, 2));
    }

    #[test]
    fn test_label_falls_back_to_reference() {
        let mut tx = transaction();
        assert_eq!(tx.label(), "SO042");
        tx.description = Some("POS Order".into());
        assert_eq!(tx.label(), "POS Order");
    }
}
