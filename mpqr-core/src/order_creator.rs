//! Creates provider QR orders for pending transactions.

use mpqr_sdk::client::MercadoPagoClient;
use mpqr_sdk::config::PaymentOrderCredentials;
use mpqr_sdk::objects::{CreateQrOrderRequest, QrOrderItem};
use rust_decimal::{Decimal, RoundingStrategy};
use time::OffsetDateTime;
use tracing::info;
use url::Url;

use crate::entities::payment_transaction::PaymentTransaction;
use crate::error::QrError;
use crate::qr_order::QrOrder;

/// Round to cents and require a strictly positive amount.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, QrError> {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded <= Decimal::ZERO {
        return Err(QrError::InvalidAmount(amount));
    }
    Ok(rounded)
}

#[derive(Debug, Clone, Default)]
pub struct OrderCreator {
    client: MercadoPagoClient,
}

impl OrderCreator {
    pub fn new(client: MercadoPagoClient) -> Self {
        Self { client }
    }

    /// Create a remote order for `transaction` and return it as a [`QrOrder`]
    /// created at `now`.
    ///
    /// Credentials are validated first; nothing is sent when any required
    /// identifier is missing. A 2xx response without `qr_data` or
    /// `in_store_order_id` is an error.
    pub async fn create_order(
        &self,
        transaction: &PaymentTransaction,
        credentials: &PaymentOrderCredentials,
        now: OffsetDateTime,
    ) -> Result<QrOrder, QrError> {
        credentials.validate()?;

        let request = build_request(transaction, credentials.notification_url.as_ref());
        let response = self.client.create_qr_order(credentials, &request).await?;

        let qr_payload = response
            .qr_data
            .filter(|data| !data.is_empty())
            .ok_or_else(|| QrError::ProviderResponse("provider did not return a QR code".into()))?;
        let remote_order_id = response
            .in_store_order_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                QrError::ProviderResponse("provider did not return an order id".into())
            })?;

        info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            remote_order_id = %remote_order_id,
            "Created provider QR order"
        );

        Ok(QrOrder {
            reference: transaction.reference.clone(),
            remote_order_id,
            qr_payload,
            qr_image: response.qr_image,
            created_at: now,
            expires_at: QrOrder::expiry_for(now),
            amount: transaction.amount,
            currency: transaction.currency.clone(),
        })
    }
}

fn build_request(
    transaction: &PaymentTransaction,
    notification_url: Option<&Url>,
) -> CreateQrOrderRequest {
    let label = transaction.label();
    CreateQrOrderRequest {
        external_reference: transaction.reference.clone(),
        notification_url: notification_url
            .map(|url| notification_url_for(url, &transaction.reference).to_string()),
        title: label.to_owned(),
        description: label.to_owned(),
        total_amount: transaction.amount,
        items: vec![QrOrderItem::single(
            &transaction.reference,
            label,
            transaction.amount,
        )],
    }
}

/// The webhook URL with the correlation key appended, so notifications can
/// be matched to a transaction without another provider round trip.
pub fn notification_url_for(base: &Url, reference: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("external_reference", reference);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TransactionState;
    use httpmock::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn transaction() -> PaymentTransaction {
        let now = OffsetDateTime::now_utc();
        PaymentTransaction {
            id: Uuid::now_v7(),
            reference: "SO042".into(),
            description: None,
            amount: Decimal::new(15025, 2),
            currency: "ARS".into(),
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
        }
    }

    fn credentials(server: &MockServer) -> PaymentOrderCredentials {
        PaymentOrderCredentials::new("TEST-token", "123", "STORE1", "POS1")
            .with_base_url(server.base_url().parse().unwrap())
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(
            normalize_amount(Decimal::new(10005, 3)).unwrap(),
            Decimal::new(1001, 2)
        );
        assert!(matches!(
            normalize_amount(Decimal::ZERO),
            Err(QrError::InvalidAmount(_))
        ));
        assert!(matches!(
            normalize_amount(Decimal::new(-5, 0)),
            Err(QrError::InvalidAmount(_))
        ));
        // Rounds to zero.
        assert!(normalize_amount(Decimal::new(4, 3)).is_err());
    }

    #[test]
    fn test_notification_url_carries_reference() {
        let base: Url = "https://shop.example/webhooks/mercado-pago".parse().unwrap();
        assert_eq!(
            notification_url_for(&base, "SO 42").as_str(),
            "https://shop.example/webhooks/mercado-pago?external_reference=SO+42"
        );
    }

    #[test]
    fn test_request_uses_reference_as_label() {
        let request = build_request(&transaction(), None);
        assert_eq!(request.title, "SO042");
        assert_eq!(request.description, "SO042");
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 1);
        assert_eq!(request.items[0].unit_price, Decimal::new(15025, 2));
        assert!(request.notification_url.is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_send_nothing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let mut creds = credentials(&server);
        creds.pos_id = String::new();
        let err = OrderCreator::default()
            .create_order(&transaction(), &creds, OffsetDateTime::now_utc())
            .await
            .unwrap_err();

        assert!(
            matches!(err, QrError::Configuration { ref missing_fields } if missing_fields == &vec!["pos_id"])
        );
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_success_without_qr_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(201).json_body(json!({"in_store_order_id": "abc"}));
            })
            .await;

        let err = OrderCreator::default()
            .create_order(&transaction(), &credentials(&server), OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, QrError::ProviderResponse(_)));
    }

    #[tokio::test]
    async fn test_success_without_order_id_is_an_error() {
        for body in [
            json!({"qr_data": "000201"}),
            json!({"qr_data": "000201", "in_store_order_id": " "}),
        ] {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(POST);
                    then.status(201).json_body(body);
                })
                .await;

            let err = OrderCreator::default()
                .create_order(&transaction(), &credentials(&server), OffsetDateTime::now_utc())
                .await
                .unwrap_err();
            assert!(
                matches!(err, QrError::ProviderResponse(ref message) if message.contains("order id")),
                "{err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_order_expires_after_ttl() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .json_body_partial(r#"{"external_reference": "SO042", "title": "SO042"}"#);
                then.status(201)
                    .json_body(json!({"qr_data": "000201", "in_store_order_id": "abc"}));
            })
            .await;

        let now = OffsetDateTime::now_utc();
        let order = OrderCreator::default()
            .create_order(&transaction(), &credentials(&server), now)
            .await
            .unwrap();

        assert_eq!(order.qr_payload, "000201");
        assert_eq!(order.remote_order_id, "abc");
        assert_eq!(order.created_at, now);
        assert_eq!(order.expires_at, now + crate::qr_order::QR_ORDER_TTL);
    }
}
