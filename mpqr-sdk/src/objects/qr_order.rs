//! In-store QR seller order, as sent to and returned by the provider.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /instore/orders/qr/seller/collectors/.../qrs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateQrOrderRequest {
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub items: Vec<QrOrderItem>,
}

/// A single line of a QR order. Orders built by this crate carry exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrOrderItem {
    pub sku_number: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub unit_measure: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl QrOrderItem {
    /// One unit at `amount`, labelled with `label`.
    pub fn single(sku: &str, label: &str, amount: Decimal) -> Self {
        Self {
            sku_number: sku.to_owned(),
            category: "others".to_owned(),
            title: label.to_owned(),
            description: label.to_owned(),
            quantity: 1,
            unit_price: amount,
            unit_measure: "unit".to_owned(),
            total_amount: amount,
        }
    }
}

/// Response of the create-order call.
///
/// Every field is optional on the wire; a response without `qr_data` is
/// rejected by the caller even when the HTTP status was 2xx.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQrOrderResponse {
    #[serde(default)]
    pub qr_data: Option<String>,
    #[serde(default)]
    pub in_store_order_id: Option<String>,
    #[serde(default)]
    pub qr_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_serialize_as_numbers() {
        let request = CreateQrOrderRequest {
            external_reference: "SO042".into(),
            notification_url: None,
            title: "SO042".into(),
            description: "SO042".into(),
            total_amount: Decimal::new(15025, 2),
            items: vec![QrOrderItem::single("SO042", "SO042", Decimal::new(15025, 2))],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["total_amount"], serde_json::json!(150.25));
        assert_eq!(json["items"][0]["unit_price"], serde_json::json!(150.25));
        assert_eq!(json["items"][0]["quantity"], serde_json::json!(1));
        assert!(json.get("notification_url").is_none());
    }

    #[test]
    fn test_empty_response_deserializes() {
        let response: CreateQrOrderResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response, CreateQrOrderResponse::default());
    }
}
