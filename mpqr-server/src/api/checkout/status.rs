use axum::{
    Json,
    extract::{Path, State},
};
use mpqr_core::QrError;
use mpqr_core::lifecycle::LookupMode;
use mpqr_sdk::objects::TransactionStatusResponse;
use uuid::Uuid;

use super::stored_status;
use crate::api::ApiError;
use crate::state::AppState;

/// `GET|POST /transactions/{transaction_id}/status`: poll settlement state.
///
/// Unknown ids answer `not_found`. A provider outage leaves the reported
/// state unchanged.
pub(super) async fn transaction_status(
    state: State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let Some(transaction) = state
        .lifecycle
        .store()
        .get(transaction_id)
        .await
        .map_err(QrError::from)?
    else {
        return Ok(Json(TransactionStatusResponse::not_found()));
    };

    let mercado_pago = state.mercado_pago().await;
    match state
        .lifecycle
        .refresh_status(
            transaction.id,
            &mercado_pago.credentials,
            LookupMode::ByReference,
        )
        .await
    {
        Ok(refresh) => Ok(Json(TransactionStatusResponse {
            state: refresh.transaction.state.into(),
            state_message: refresh.state_message(),
        })),
        Err(e) if e.is_transient() => {
            tracing::warn!(
                transaction_id = %transaction_id,
                error = %e,
                "Provider unreachable, reporting stored state"
            );
            Ok(Json(stored_status(&transaction)))
        }
        Err(QrError::TransactionNotFound(_)) => Ok(Json(TransactionStatusResponse::not_found())),
        Err(e) => Err(e.into()),
    }
}
