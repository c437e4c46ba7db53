//! Errors surfaced by the lifecycle core.

use mpqr_sdk::client::ClientError;
use mpqr_sdk::config::MissingCredentials;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::TransactionState;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QrError {
    /// Required credentials are missing. Never retried automatically.
    #[error("configuration error: missing {}", missing_fields.join(", "))]
    Configuration { missing_fields: Vec<&'static str> },

    /// The provider answered with an HTTP error status.
    #[error("provider API error {status_code}: {body}")]
    ProviderApi { status_code: u16, body: String },

    /// The provider answered 2xx with an unusable body.
    #[error("unexpected provider response: {0}")]
    ProviderResponse(String),

    /// Network failure or timeout. Safe to retry on the next poll.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The configured provider base URL cannot be used.
    #[error("invalid provider endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("transaction {id} is already {state}")]
    AlreadySettled { id: Uuid, state: TransactionState },

    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// A reference is already bound to a different or settled transaction.
    #[error("reference {0} is already in use")]
    ReferenceConflict(String),

    /// Another writer replaced the QR order between our read and write.
    #[error("QR order of transaction {0} was replaced concurrently")]
    ConcurrentUpdate(Uuid),
}

impl From<ClientError> for QrError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Transport(e) => QrError::Transport(e),
            ClientError::ProviderApi { status_code, body } => {
                QrError::ProviderApi { status_code, body }
            }
            ClientError::Json(e) => QrError::ProviderResponse(e.to_string()),
            ClientError::Url(e) => QrError::InvalidEndpoint(e),
        }
    }
}

impl From<MissingCredentials> for QrError {
    fn from(value: MissingCredentials) -> Self {
        QrError::Configuration {
            missing_fields: value.0,
        }
    }
}

impl QrError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, QrError::Transport(_))
    }

    /// Text safe to show to a buyer or cashier.
    pub fn user_message(&self) -> &'static str {
        match self {
            QrError::Configuration { .. } | QrError::InvalidEndpoint(_) => {
                "The payment method is not configured correctly."
            }
            QrError::ProviderApi { .. } => "The payment provider returned an error.",
            QrError::ProviderResponse(_) => "The payment provider did not return a QR code.",
            QrError::Transport(_) => "The payment provider is unreachable. Please try again.",
            QrError::TransactionNotFound(_) => "Transaction not found.",
            QrError::AlreadySettled { .. } => "This transaction is already settled.",
            QrError::InvalidAmount(_) => "The amount must be greater than zero.",
            QrError::ReferenceConflict(_) => "This order reference is already in use.",
            QrError::Store(_) | QrError::ConcurrentUpdate(_) => {
                "An internal error occurred. Please try again."
            }
        }
    }
}
