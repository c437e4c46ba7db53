//! SettlementNotifier processor.
//!
//! The SettlementNotifier is responsible for:
//! - Receiving `SettlementEvent` from the queue
//! - Signing the notification body with the configured secret
//! - POSTing it to the configured downstream URL
//! - Retrying failures with exponential backoff (2^0 to 2^11 seconds)
//!
//! Each event is delivered by its own task so a slow endpoint does not hold
//! back other settlements. Pending retries stop on the shutdown signal.

use crate::config::{ConfigStore, NotificationTarget};
use crate::events::{SettlementEvent, SettlementEventReceiver};
use mpqr_sdk::signature::{NOTIFICATION_SIGNATURE_HEADER, sign_body};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Maximum backoff exponent (2^11 = 2048 seconds max backoff)
const MAX_RETRY_COUNT: u32 = 11;

/// Delivery attempts per event, the first one included.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 8;

/// Errors that can occur during notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("notification delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SettlementNotifier delivers settlement events downstream.
pub struct SettlementNotifier {
    events_rx: SettlementEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    http_client: reqwest::Client,
    target: ConfigStore<Option<NotificationTarget>>,
}

impl SettlementNotifier {
    /// Create a new SettlementNotifier.
    ///
    /// # Arguments
    ///
    /// * `events_rx` - Receiver for SettlementEvent events
    /// * `shutdown_rx` - Receiver for shutdown signal
    /// * `target` - Downstream endpoint; events are dropped while it is `None`
    pub fn new(
        events_rx: SettlementEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
        target: ConfigStore<Option<NotificationTarget>>,
    ) -> Self {
        Self {
            events_rx,
            shutdown_rx,
            http_client: notification_http_client(),
            target,
        }
    }

    /// Run the SettlementNotifier.
    pub async fn run(mut self) {
        info!("SettlementNotifier started");
        let mut deliveries = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("SettlementNotifier received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    debug!(transaction_id = %event.transaction_id, "Received SettlementEvent");
                    let client = self.http_client.clone();
                    let target = self.target.clone();
                    let shutdown_rx = self.shutdown_rx.clone();
                    deliveries.spawn(deliver_with_retry(client, target, event, shutdown_rx));
                }

                // Reap finished deliveries
                Some(_) = deliveries.join_next(), if !deliveries.is_empty() => {}

                else => {
                    info!("SettlementEvent channel closed");
                    break;
                }
            }
        }

        // In-flight deliveries observe the same shutdown signal.
        while deliveries.join_next().await.is_some() {}

        info!("SettlementNotifier shutdown complete");
    }
}

async fn deliver_with_retry(
    client: reqwest::Client,
    target: ConfigStore<Option<NotificationTarget>>,
    event: SettlementEvent,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    for attempt in 0..MAX_DELIVERY_ATTEMPTS {
        // Re-read every attempt so a reloaded target applies to retries.
        let Some(target) = target.snapshot().await else {
            debug!(
                transaction_id = %event.transaction_id,
                "No notification target configured, dropping settlement event"
            );
            return;
        };

        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        match deliver_once(&client, &target, &event, now).await {
            Ok(()) => {
                info!(
                    transaction_id = %event.transaction_id,
                    attempt = attempt + 1,
                    "Settlement notification delivered"
                );
                return;
            }
            Err(e) => {
                warn!(
                    transaction_id = %event.transaction_id,
                    error = %e,
                    attempt = attempt + 1,
                    "Settlement notification delivery failed"
                );
            }
        }

        if attempt + 1 == MAX_DELIVERY_ATTEMPTS {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    warn!(
                        transaction_id = %event.transaction_id,
                        "Shutting down with settlement notification undelivered"
                    );
                    return;
                }
            }
            _ = tokio::time::sleep(calculate_retry_delay(attempt)) => {}
        }
    }

    error!(
        transaction_id = %event.transaction_id,
        attempts = MAX_DELIVERY_ATTEMPTS,
        "Giving up on settlement notification"
    );
}

/// Sign and POST one notification.
pub async fn deliver_once(
    client: &reqwest::Client,
    target: &NotificationTarget,
    event: &SettlementEvent,
    timestamp: i64,
) -> Result<(), NotifyError> {
    let body = serde_json::to_string(&event.to_payload(timestamp))?;
    let signature = sign_body(&body, target.secret_bytes(), timestamp);

    let response = client
        .post(target.url.clone())
        .header("Content-Type", "application/json")
        .header(NOTIFICATION_SIGNATURE_HEADER, signature)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }
}

/// Calculate the next retry delay based on retry count.
///
/// Uses exponential backoff: 2^retry_count seconds.
pub fn calculate_retry_delay(retry_count: u32) -> std::time::Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_RETRY_COUNT));
    std::time::Duration::from_secs(seconds)
}

/// HTTP client for downstream deliveries, with a 30 second timeout.
fn notification_http_client() -> reqwest::Client {
    match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(
                error = %e,
                "Failed to build notification HTTP client, deliveries have no timeout"
            );
            reqwest::Client::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TransactionState;
    use crate::events::settlement_event_channel;
    use httpmock::prelude::*;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use uuid::Uuid;

    fn event() -> SettlementEvent {
        SettlementEvent {
            transaction_id: Uuid::now_v7(),
            reference: "SO042".into(),
            state: TransactionState::Done,
            amount: Decimal::new(1000, 2),
            currency: "ARS".into(),
            payment_id: Some(55),
            state_message: None,
            settled_at: time::OffsetDateTime::now_utc(),
        }
    }

    fn target(server: &MockServer) -> NotificationTarget {
        NotificationTarget::new(server.url("/settled").parse().unwrap(), b"secret".to_vec())
    }

    #[test]
    fn test_retry_delay_calculation() {
        assert_eq!(calculate_retry_delay(0), Duration::from_secs(1));
        assert_eq!(calculate_retry_delay(1), Duration::from_secs(2));
        assert_eq!(calculate_retry_delay(2), Duration::from_secs(4));
        assert_eq!(calculate_retry_delay(10), Duration::from_secs(1024));
        assert_eq!(calculate_retry_delay(11), Duration::from_secs(2048));
        // Max capped at 11
        assert_eq!(calculate_retry_delay(12), Duration::from_secs(2048));
        assert_eq!(calculate_retry_delay(100), Duration::from_secs(2048));
    }

    #[tokio::test]
    async fn test_deliver_once_signs_body() {
        let server = MockServer::start_async().await;
        let event = event();
        let expected = serde_json::to_string(&event.to_payload(1_700_000_000)).unwrap();
        let signature = sign_body(&expected, b"secret", 1_700_000_000);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/settled")
                    .header(NOTIFICATION_SIGNATURE_HEADER, &signature)
                    .json_body_partial(r#"{"event_type": "transaction_settled", "state": "done", "payment_id": 55}"#);
                then.status(200);
            })
            .await;

        deliver_once(&reqwest::Client::new(), &target(&server), &event, 1_700_000_000)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_once_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/settled");
                then.status(503).body("busy");
            })
            .await;

        let err = deliver_once(&reqwest::Client::new(), &target(&server), &event(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_run_delivers_and_stops_on_shutdown() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/settled");
                then.status(204);
            })
            .await;

        let (events_tx, events_rx) = settlement_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let notifier = SettlementNotifier::new(
            events_rx,
            shutdown_rx,
            ConfigStore::new(Some(target(&server))),
        );
        let handle = tokio::spawn(notifier.run());

        events_tx.send(event()).await.unwrap();
        for _ in 0..50 {
            if mock.hits_async().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(mock.hits_async().await, 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_without_target_nothing_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        deliver_with_retry(
            reqwest::Client::new(),
            ConfigStore::new(None),
            event(),
            watch::channel(false).1,
        )
        .await;
        assert_eq!(mock.hits_async().await, 0);
    }
}
