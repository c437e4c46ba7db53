//! HTTP surfaces.
//!
//! - [`checkout`]: online checkout frontends (`/api/v1/checkout`)
//! - [`pos`]: point-of-sale terminals (`/api/v1/pos`)
//! - [`webhook`]: provider notifications (`/webhooks/mercado-pago`)

pub mod checkout;
pub mod extractors;
pub mod pos;
pub mod webhook;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mpqr_core::QrError;
use serde::Serialize;

/// Errors returned by the checkout and point-of-sale handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A lifecycle operation failed.
    Lifecycle(QrError),
    /// The request was well-formed JSON but unusable.
    BadRequest(&'static str),
}

impl From<QrError> for ApiError {
    fn from(err: QrError) -> Self {
        ApiError::Lifecycle(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn status_for(err: &QrError) -> StatusCode {
    match err {
        QrError::Configuration { .. } | QrError::InvalidEndpoint(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        QrError::ProviderApi { .. } | QrError::ProviderResponse(_) => StatusCode::BAD_GATEWAY,
        QrError::Transport(_) => StatusCode::GATEWAY_TIMEOUT,
        QrError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        QrError::AlreadySettled { .. } | QrError::ReferenceConflict(_) => StatusCode::CONFLICT,
        QrError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
        QrError::Store(_) | QrError::ConcurrentUpdate(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Lifecycle(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, status = status.as_u16(), "Request failed");
                } else {
                    tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
                }
                (
                    status,
                    Json(ErrorBody {
                        error: err.user_message(),
                    }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
            }
        }
    }
}
