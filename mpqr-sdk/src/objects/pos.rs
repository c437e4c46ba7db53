//! Point-of-sale API request and response types.
//!
//! The terminal sends an amount and its own order name, shows the returned
//! QR, then polls `status` until the verdict is `approved`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default label when the terminal sends no description.
pub const DEFAULT_POS_DESCRIPTION: &str = "POS Order";

/// Default correlation key when the terminal sends none.
pub const DEFAULT_POS_REFERENCE: &str = "pos-order";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosCreateRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosCreateResponse {
    pub qr_data: String,
    pub in_store_order_id: String,
    pub external_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosStatusRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// `status` is `approved`, `rejected`, `pending`, `not_found`, or the raw
/// provider status of an attempt still in flight (e.g. `in_process`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
}
