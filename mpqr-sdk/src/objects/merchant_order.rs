//! Merchant orders: the provider's aggregate of payment attempts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status reported once the goods are marked as delivered.
pub const ORDER_STATUS_DELIVERED: &str = "delivered";

/// `GET /merchant_orders/{id}`, or one element of a search page.
///
/// The provider sends `null` for absent collections, hence the optional
/// `payments` with a slice accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantOrder {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payments: Option<Vec<MerchantOrderPayment>>,
}

impl MerchantOrder {
    pub fn payments(&self) -> &[MerchantOrderPayment] {
        self.payments.as_deref().unwrap_or_default()
    }

    pub fn is_delivered(&self) -> bool {
        self.order_status.as_deref() == Some(ORDER_STATUS_DELIVERED)
    }
}

/// A payment attempt nested in a merchant order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantOrderPayment {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<Decimal>,
}

impl MerchantOrderPayment {
    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }
}

/// `GET /merchant_orders/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantOrderSearch {
    #[serde(default)]
    pub elements: Option<Vec<MerchantOrder>>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl MerchantOrderSearch {
    /// The first element, which is the newest when sorted by
    /// `date_created` descending.
    pub fn into_latest(self) -> Option<MerchantOrder> {
        self.elements.and_then(|elements| elements.into_iter().next())
    }
}
