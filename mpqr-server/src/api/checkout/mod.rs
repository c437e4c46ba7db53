//! Online checkout API handlers.
//!
//! These endpoints are called by the checkout frontend, which renders the
//! QR and polls the status URL until the transaction settles.
//!
//! # Endpoints
//!
//! - `POST /transactions`                      – open a pending transaction
//! - `GET  /transactions/{transaction_id}/render` – QR rendering payload
//! - `GET|POST /transactions/{transaction_id}/status` – poll settlement state

use axum::{
    Router,
    routing::{get, post},
};
use mpqr_core::entities::payment_transaction::PaymentTransaction;
use mpqr_core::lifecycle::LifecycleState;
use mpqr_sdk::objects::{TransactionResponse, TransactionStatusResponse};

use crate::state::AppState;

mod create_transaction;
mod render;
mod status;

/// Mount point of this router.
pub const BASE_PATH: &str = "/api/v1/checkout";

/// Build the checkout API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            post(create_transaction::create_transaction),
        )
        .route(
            "/transactions/{transaction_id}/render",
            get(render::render_checkout),
        )
        .route(
            "/transactions/{transaction_id}/status",
            get(status::transaction_status).post(status::transaction_status),
        )
}

/// Convert a `PaymentTransaction` (DB model) into a `TransactionResponse` (API model).
fn to_response(transaction: &PaymentTransaction) -> TransactionResponse {
    TransactionResponse {
        transaction_id: transaction.id,
        reference: transaction.reference.clone(),
        amount: transaction.amount,
        currency: transaction.currency.to_string(),
        state: transaction.state.into(),
        lifecycle: LifecycleState::of(transaction).into(),
        created_at: transaction.created_at.unix_timestamp(),
    }
}

/// The stored state, as reported without consulting the provider.
fn stored_status(transaction: &PaymentTransaction) -> TransactionStatusResponse {
    TransactionStatusResponse {
        state: transaction.state.into(),
        state_message: transaction.state_message.clone(),
    }
}
