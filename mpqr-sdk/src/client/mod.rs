//! HTTP client for the provider API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod api;

pub use api::MercadoPagoClient;

use reqwest::StatusCode;

/// Errors produced by the provider API client.
///
/// Transport failures are kept apart from API errors so callers can treat
/// them as transient.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-level failure (DNS, TLS, connection reset, timeout, …).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a status code of 400 or above.
    #[error("provider api error: status {status_code}, body: {body}")]
    ProviderApi { status_code: u16, body: String },

    /// A 2xx body that is not the expected JSON, or a payload that could not
    /// be encoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL is invalid or cannot carry a path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::ProviderApi { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
