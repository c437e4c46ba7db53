use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use compact_str::CompactString;
use mpqr_core::lifecycle::OpenTransaction;
use mpqr_sdk::objects::CreateTransactionRequest;

use super::to_response;
use crate::api::ApiError;
use crate::state::AppState;

/// `POST /transactions`: open a pending transaction.
///
/// The currency falls back to the configured default and the reference to
/// one derived from the transaction id.
pub(super) async fn create_transaction(
    state: State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = match payload.currency {
        Some(currency) if !currency.trim().is_empty() => {
            CompactString::from(currency.trim().to_ascii_uppercase())
        }
        _ => state.mercado_pago().await.default_currency,
    };
    let reference = payload
        .reference
        .map(|reference| reference.trim().to_owned())
        .filter(|reference| !reference.is_empty());

    let transaction = state
        .lifecycle
        .create_transaction(OpenTransaction {
            reference,
            description: None,
            amount: payload.amount,
            currency,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(&transaction))))
}
