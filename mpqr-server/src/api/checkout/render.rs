use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use mpqr_core::QrError;
use mpqr_sdk::objects::CheckoutRendering;
use uuid::Uuid;

use super::BASE_PATH;
use crate::api::ApiError;
use crate::state::AppState;

/// `GET /transactions/{transaction_id}/render`: QR rendering payload.
///
/// Creates the provider order on first use and regenerates it once
/// expired. Any failure to obtain a QR fails the request; a stale QR is
/// never returned.
pub(super) async fn render_checkout(
    state: State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mercado_pago = state.mercado_pago().await;
    let order = state
        .lifecycle
        .ensure_order(transaction_id, &mercado_pago.credentials)
        .await?;

    let status_poll_url = state
        .config
        .server
        .snapshot()
        .await
        .public_url(&format!("{BASE_PATH}/transactions/{transaction_id}/status"))
        .map_err(QrError::InvalidEndpoint)?;

    Ok(Json(CheckoutRendering {
        qr_payload: order.qr_payload,
        qr_image: order.qr_image,
        remote_order_id: order.remote_order_id,
        reference: order.reference,
        amount: order.amount,
        currency: order.currency.to_string(),
        expires_at: order.expires_at.unix_timestamp(),
        status_poll_url: status_poll_url.to_string(),
    }))
}
