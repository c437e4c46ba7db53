//! Online checkout API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local transaction state for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `mpqr-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Pending,
    Done,
    Cancelled,
    /// Unknown transaction id, or one not paid through this method.
    NotFound,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Pending => write!(f, "pending"),
            TransactionState::Done => write!(f, "done"),
            TransactionState::Cancelled => write!(f, "cancelled"),
            TransactionState::NotFound => write!(f, "not_found"),
        }
    }
}

/// Where a transaction is in its QR lifecycle.
///
/// API version of `mpqr_core::lifecycle::LifecycleState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No QR order has been created yet.
    Uninitialized,
    OrderCreated,
    SettledApproved,
    SettledRejected,
}

/// Request body for opening a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    /// Correlation key; generated from the transaction id when absent.
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: Decimal,
    /// ISO 4217 code; the configured default currency when absent.
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: TransactionState,
    pub lifecycle: LifecycleState,
    pub created_at: i64,
}

/// Everything the frontend needs to show the QR and poll for settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRendering {
    pub qr_payload: String,
    pub qr_image: Option<String>,
    pub remote_order_id: String,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    /// Unix timestamp after which the QR is regenerated.
    pub expires_at: i64,
    pub status_poll_url: String,
}

/// Response of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatusResponse {
    pub state: TransactionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_message: Option<String>,
}

impl TransactionStatusResponse {
    pub fn not_found() -> Self {
        Self {
            state: TransactionState::NotFound,
            state_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_serializes_without_message() {
        let json = serde_json::to_string(&TransactionStatusResponse::not_found()).unwrap();
        assert_eq!(json, r#"{"state":"not_found"}"#);
    }

    #[test]
    fn test_lifecycle_state_is_snake_case() {
        let json = serde_json::to_string(&LifecycleState::SettledApproved).unwrap();
        assert_eq!(json, r#""settled_approved""#);
    }
}
