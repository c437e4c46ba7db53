//! Custom Axum extractors.
//!
//! Provides `ProviderSignatureHeaders`, which collects the `x-signature` and
//! `x-request-id` headers the provider attaches to webhook deliveries.
//!
//! All cryptographic operations are delegated to [`mpqr_sdk::signature`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use mpqr_sdk::signature::{
    self, PROVIDER_REQUEST_ID_HEADER, PROVIDER_SIGNATURE_HEADER, SignatureError,
};

/// Signature headers of a provider notification.
///
/// Extraction never fails; whether a signature is required is decided by
/// the handler from the configured webhook secret.
///
/// # Header format
///
/// ```text
/// x-signature:  ts={unix_timestamp},v1={hex_hmac}
/// x-request-id: {uuid}
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderSignatureHeaders {
    pub signature: Option<String>,
    pub request_id: Option<String>,
}

/// Errors returned when a webhook signature does not verify.
#[derive(Debug, thiserror::Error)]
pub enum WebhookSignatureError {
    #[error("missing x-signature header")]
    MissingHeader,
    #[error("invalid x-signature header: {0}")]
    Invalid(#[from] SignatureError),
}

impl IntoResponse for WebhookSignatureError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Rejected provider notification");
        let message = match self {
            WebhookSignatureError::MissingHeader => "missing x-signature header",
            WebhookSignatureError::Invalid(SignatureError::SignatureMismatch) => {
                "signature verification failed"
            }
            WebhookSignatureError::Invalid(_) => "invalid x-signature header",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl ProviderSignatureHeaders {
    /// Verify the signature over the notified resource id.
    pub fn verify(&self, data_id: Option<&str>, secret: &[u8]) -> Result<(), WebhookSignatureError> {
        let header = self
            .signature
            .as_deref()
            .ok_or(WebhookSignatureError::MissingHeader)?;
        signature::verify_provider_signature(header, data_id, self.request_id.as_deref(), secret)?;
        Ok(())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ProviderSignatureHeaders {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        Ok(Self {
            signature: header(PROVIDER_SIGNATURE_HEADER),
            request_id: header(PROVIDER_REQUEST_ID_HEADER),
        })
    }
}
