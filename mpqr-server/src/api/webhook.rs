//! Provider notification endpoint.
//!
//! The provider retries deliveries that are not acknowledged, so every
//! notification is answered with 200 once its signature checks out, even
//! when the refresh it triggers fails. The next delivery or status poll
//! retries the refresh.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
};
use mpqr_core::QrError;
use mpqr_core::lifecycle::LookupMode;
use mpqr_sdk::config::PaymentOrderCredentials;
use mpqr_sdk::objects::{NotificationTopic, ProviderNotification};
use serde::Deserialize;

use crate::api::extractors::{ProviderSignatureHeaders, WebhookSignatureError};
use crate::state::AppState;

/// Query string of a notification.
///
/// Webhooks repeat `type` and `data.id` here; IPN deliveries carry `topic`
/// and `id` only here. `external_reference` is appended to the
/// notification URL when the order is created.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default, rename = "data.id")]
    data_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
}

fn parse_body(body: &[u8]) -> ProviderNotification {
    if body.iter().all(u8::is_ascii_whitespace) {
        return ProviderNotification::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Notification body is not JSON, using query only");
        ProviderNotification::default()
    })
}

/// `POST /webhooks/mercado-pago`: provider notification.
pub async fn receive_notification(
    state: State<AppState>,
    Query(query): Query<NotificationQuery>,
    signature: ProviderSignatureHeaders,
    body: Bytes,
) -> Result<StatusCode, WebhookSignatureError> {
    let notification = parse_body(&body);
    let topic = notification.topic().or_else(|| {
        query
            .kind
            .as_deref()
            .or(query.topic.as_deref())
            .map(NotificationTopic::parse)
    });
    let resource_id = query
        .data_id
        .clone()
        .or_else(|| notification.resource_id())
        .or_else(|| query.id.clone());

    let mercado_pago = state.mercado_pago().await;
    if let Some(secret) = &mercado_pago.webhook_secret {
        signature.verify(resource_id.as_deref(), secret)?;
    }

    let topic = match topic {
        Some(topic) if topic.triggers_refresh() => topic,
        other => {
            tracing::debug!(topic = ?other, "Ignoring notification");
            return Ok(StatusCode::OK);
        }
    };

    let credentials = &mercado_pago.credentials;
    let reference = match notification_reference(
        &state,
        credentials,
        &topic,
        &query,
        &notification,
        resource_id.as_deref(),
    )
    .await
    {
        Ok(Some(reference)) => reference,
        Ok(None) => {
            tracing::debug!(
                topic = %topic,
                resource_id = ?resource_id,
                "Notification carries no external reference"
            );
            return Ok(StatusCode::OK);
        }
        Err(e) => {
            tracing::warn!(
                topic = %topic,
                resource_id = ?resource_id,
                error = %e,
                "Failed to resolve notification reference"
            );
            return Ok(StatusCode::OK);
        }
    };

    match state
        .lifecycle
        .refresh_by_reference(&reference, credentials, LookupMode::ByReference)
        .await
    {
        Ok(Some(refresh)) => {
            tracing::info!(
                reference = %reference,
                topic = %topic,
                state = %refresh.transaction.state,
                applied = refresh.applied,
                "Processed provider notification"
            );
        }
        Ok(None) => {
            tracing::debug!(reference = %reference, "Notification for unknown reference");
        }
        Err(e) => {
            tracing::warn!(
                reference = %reference,
                error = %e,
                transient = e.is_transient(),
                "Refresh from notification failed"
            );
        }
    }

    Ok(StatusCode::OK)
}

/// Correlation key of a notification.
///
/// Merchant order notifications without one in the query or body are
/// resolved by fetching the merchant order.
async fn notification_reference(
    state: &AppState,
    credentials: &PaymentOrderCredentials,
    topic: &NotificationTopic,
    query: &NotificationQuery,
    notification: &ProviderNotification,
    resource_id: Option<&str>,
) -> Result<Option<String>, QrError> {
    let direct = query
        .external_reference
        .clone()
        .or_else(|| notification.external_reference.clone())
        .filter(|reference| !reference.is_empty());
    if direct.is_some() {
        return Ok(direct);
    }

    match (topic, resource_id) {
        (NotificationTopic::MerchantOrder, Some(merchant_order_id)) => {
            // Merchant order ids are numeric.
            if merchant_order_id.is_empty()
                || !merchant_order_id.bytes().all(|b| b.is_ascii_digit())
            {
                tracing::debug!(merchant_order_id, "Ignoring malformed merchant order id");
                return Ok(None);
            }
            credentials.validate()?;
            let order = state
                .client
                .get_merchant_order(credentials, merchant_order_id)
                .await?;
            Ok(order.external_reference.filter(|r| !r.is_empty()))
        }
        _ => Ok(None),
    }
}
