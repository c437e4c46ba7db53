//! Maps provider merchant orders to a canonical settlement verdict.

use mpqr_sdk::client::MercadoPagoClient;
use mpqr_sdk::config::PaymentOrderCredentials;
use mpqr_sdk::objects::MerchantOrder;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::QrError;

pub const PAYMENT_APPROVED: &str = "approved";
pub const PAYMENT_REJECTED: &str = "rejected";

/// Outcome of a status lookup. Never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementVerdict {
    /// Not settled yet. `detail` is the provider's raw sub-state, if any.
    Pending { detail: Option<String> },
    Approved {
        payment_id: Option<i64>,
        amount: Option<Decimal>,
    },
    Rejected { detail: Option<String> },
}

impl SettlementVerdict {
    pub fn pending() -> Self {
        SettlementVerdict::Pending { detail: None }
    }

    /// Status string as reported to point-of-sale terminals.
    pub fn status(&self) -> &str {
        match self {
            SettlementVerdict::Approved { .. } => PAYMENT_APPROVED,
            SettlementVerdict::Rejected { .. } => PAYMENT_REJECTED,
            SettlementVerdict::Pending { detail } => detail.as_deref().unwrap_or("pending"),
        }
    }
}

/// How to find the merchant order for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
    /// Search by correlation key and take the newest match.
    ByReference(String),
    /// Fetch the order directly. On a 404 the verdict is pending, unless a
    /// fallback reference is given, in which case that is searched instead.
    ByRemoteId {
        remote_order_id: String,
        fallback_reference: Option<String>,
    },
}

/// Apply the canonical priority to a merchant order:
/// approved, rejected, first payment's status, delivered, pending.
pub fn canonicalize(order: &MerchantOrder) -> SettlementVerdict {
    let payments = order.payments();

    if let Some(payment) = payments.iter().find(|p| p.has_status(PAYMENT_APPROVED)) {
        return SettlementVerdict::Approved {
            payment_id: payment.id,
            amount: payment.transaction_amount,
        };
    }
    if let Some(payment) = payments.iter().find(|p| p.has_status(PAYMENT_REJECTED)) {
        return SettlementVerdict::Rejected {
            detail: payment.status_detail.clone(),
        };
    }
    if let Some(first) = payments.first() {
        return SettlementVerdict::Pending {
            detail: first.status.clone(),
        };
    }
    if order.is_delivered() {
        return SettlementVerdict::Approved {
            payment_id: None,
            amount: None,
        };
    }
    SettlementVerdict::Pending {
        detail: order.order_status.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusResolver {
    client: MercadoPagoClient,
}

impl StatusResolver {
    pub fn new(client: MercadoPagoClient) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        credentials: &PaymentOrderCredentials,
        lookup: &StatusLookup,
    ) -> Result<SettlementVerdict, QrError> {
        match lookup {
            StatusLookup::ByReference(reference) => {
                self.resolve_by_reference(credentials, reference).await
            }
            StatusLookup::ByRemoteId {
                remote_order_id,
                fallback_reference,
            } => {
                match self
                    .client
                    .get_merchant_order(credentials, remote_order_id)
                    .await
                {
                    Ok(order) => Ok(canonicalize(&order)),
                    Err(e) if e.is_not_found() => match fallback_reference {
                        Some(reference) => {
                            debug!(
                                remote_order_id = %remote_order_id,
                                reference = %reference,
                                "Merchant order not found, searching by reference"
                            );
                            self.resolve_by_reference(credentials, reference).await
                        }
                        None => {
                            debug!(
                                remote_order_id = %remote_order_id,
                                "Merchant order not indexed yet"
                            );
                            Ok(SettlementVerdict::pending())
                        }
                    },
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn resolve_by_reference(
        &self,
        credentials: &PaymentOrderCredentials,
        reference: &str,
    ) -> Result<SettlementVerdict, QrError> {
        let page = self
            .client
            .search_merchant_orders(credentials, reference)
            .await?;
        Ok(page
            .into_latest()
            .map(|order| canonicalize(&order))
            .unwrap_or_else(SettlementVerdict::pending))
    }
}
