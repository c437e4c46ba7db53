//! Point-of-sale API handlers.
//!
//! These endpoints are called by in-store terminals: create an order, show
//! its QR, then poll until the payment is approved.
//!
//! # Endpoints
//!
//! - `POST /orders` – create a QR order for an amount
//! - `POST /status` – status of an order by remote id and/or reference

use axum::{Json, Router, extract::State, routing::post};
use mpqr_core::entities::TransactionState;
use mpqr_core::lifecycle::{LookupMode, OpenTransaction, StatusRefresh};
use mpqr_core::status_resolver::{
    PAYMENT_APPROVED, PAYMENT_REJECTED, SettlementVerdict, StatusLookup,
};
use mpqr_sdk::objects::{
    DEFAULT_POS_DESCRIPTION, DEFAULT_POS_REFERENCE, PosCreateRequest, PosCreateResponse,
    PosStatusRequest, PosStatusResponse,
};
use uuid::Uuid;

use crate::api::ApiError;
use crate::state::AppState;

/// Mount point of this router.
pub const BASE_PATH: &str = "/api/v1/pos";

/// Status reported when neither a local transaction nor a remote id is known.
const STATUS_NOT_FOUND: &str = "not_found";

/// Build the point-of-sale API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/status", post(order_status))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// `POST /orders`: create a QR order.
///
/// A terminal resending the same `external_reference` for the same amount
/// gets the same order back while it is live.
async fn create_order(
    state: State<AppState>,
    Json(payload): Json<PosCreateRequest>,
) -> Result<Json<PosCreateResponse>, ApiError> {
    let mercado_pago = state.mercado_pago().await;
    let request = OpenTransaction {
        reference: None,
        description: Some(
            non_empty(payload.description).unwrap_or_else(|| DEFAULT_POS_DESCRIPTION.to_owned()),
        ),
        amount: payload.amount,
        currency: mercado_pago.default_currency.clone(),
    };

    let transaction = match non_empty(payload.external_reference) {
        Some(reference) => state.lifecycle.open_by_reference(reference, request).await?,
        None => {
            let reference = format!("{DEFAULT_POS_REFERENCE}-{}", Uuid::now_v7().simple());
            state
                .lifecycle
                .create_transaction(OpenTransaction {
                    reference: Some(reference),
                    ..request
                })
                .await?
        }
    };

    let order = state
        .lifecycle
        .ensure_order(transaction.id, &mercado_pago.credentials)
        .await?;

    Ok(Json(PosCreateResponse {
        qr_data: order.qr_payload,
        in_store_order_id: order.remote_order_id,
        external_reference: order.reference,
    }))
}

/// `POST /status`: settlement status for a terminal.
///
/// A known reference refreshes the local transaction, looking the remote
/// order up directly and falling back to the reference search. A bare
/// `order_id` is resolved against the provider only.
async fn order_status(
    state: State<AppState>,
    Json(payload): Json<PosStatusRequest>,
) -> Result<Json<PosStatusResponse>, ApiError> {
    let order_id = non_empty(payload.order_id);
    let reference = non_empty(payload.external_reference);
    if order_id.is_none() && reference.is_none() {
        return Err(ApiError::BadRequest(
            "order_id or external_reference is required",
        ));
    }

    let mercado_pago = state.mercado_pago().await;
    if let Some(reference) = &reference {
        let refresh = state
            .lifecycle
            .refresh_by_reference(
                reference,
                &mercado_pago.credentials,
                LookupMode::ByRemoteId {
                    fallback_to_reference: true,
                },
            )
            .await?;
        if let Some(refresh) = refresh {
            return Ok(Json(refresh_response(&refresh)));
        }
    }

    let Some(remote_order_id) = order_id else {
        return Ok(Json(PosStatusResponse {
            status: STATUS_NOT_FOUND.to_owned(),
            transaction_amount: None,
            payment_id: None,
        }));
    };
    let verdict = state
        .lifecycle
        .resolver()
        .resolve(
            &mercado_pago.credentials,
            &StatusLookup::ByRemoteId {
                remote_order_id,
                fallback_reference: reference,
            },
        )
        .await?;
    Ok(Json(verdict_response(&verdict)))
}

fn verdict_response(verdict: &SettlementVerdict) -> PosStatusResponse {
    match verdict {
        SettlementVerdict::Approved { payment_id, amount } => PosStatusResponse {
            status: PAYMENT_APPROVED.to_owned(),
            transaction_amount: *amount,
            payment_id: *payment_id,
        },
        other => PosStatusResponse {
            status: other.status().to_owned(),
            transaction_amount: None,
            payment_id: None,
        },
    }
}

fn refresh_response(refresh: &StatusRefresh) -> PosStatusResponse {
    let transaction = &refresh.transaction;
    if let Some(verdict) = &refresh.verdict {
        let mut response = verdict_response(verdict);
        if transaction.state == TransactionState::Done {
            response.transaction_amount = response.transaction_amount.or(Some(transaction.amount));
        }
        return response;
    }
    // Already settled before this call; nothing was looked up.
    match transaction.state {
        TransactionState::Done => PosStatusResponse {
            status: PAYMENT_APPROVED.to_owned(),
            transaction_amount: Some(transaction.amount),
            payment_id: transaction.payment_id,
        },
        TransactionState::Cancelled => PosStatusResponse {
            status: PAYMENT_REJECTED.to_owned(),
            transaction_amount: None,
            payment_id: None,
        },
        TransactionState::Pending => PosStatusResponse {
            status: SettlementVerdict::pending().status().to_owned(),
            transaction_amount: None,
            payment_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_verdict_response() {
        let approved = verdict_response(&SettlementVerdict::Approved {
            payment_id: Some(99),
            amount: Some(Decimal::new(1250, 2)),
        });
        assert_eq!(approved.status, "approved");
        assert_eq!(approved.payment_id, Some(99));

        let in_flight = verdict_response(&SettlementVerdict::Pending {
            detail: Some("in_process".into()),
        });
        assert_eq!(in_flight.status, "in_process");
        assert_eq!(in_flight.transaction_amount, None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" SO1 ".into())).as_deref(), Some("SO1"));
        assert_eq!(non_empty(None), None);
    }
}
