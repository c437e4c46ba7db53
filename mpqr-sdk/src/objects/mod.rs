//! Request and response types.
//!
//! Provider-facing types mirror the in-store orders and merchant orders
//! APIs. The remaining modules describe this system's own HTTP surface.

pub mod checkout;
pub mod merchant_order;
pub mod notification;
pub mod pos;
pub mod qr_order;
pub mod settlement;

pub use checkout::{
    CheckoutRendering, CreateTransactionRequest, LifecycleState, TransactionResponse,
    TransactionState, TransactionStatusResponse,
};
pub use merchant_order::{MerchantOrder, MerchantOrderPayment, MerchantOrderSearch};
pub use notification::{NotificationTopic, ProviderNotification};
pub use pos::{
    DEFAULT_POS_DESCRIPTION, DEFAULT_POS_REFERENCE, PosCreateRequest, PosCreateResponse,
    PosStatusRequest, PosStatusResponse,
};
pub use qr_order::{CreateQrOrderRequest, CreateQrOrderResponse, QrOrderItem};
pub use settlement::{SETTLEMENT_EVENT_TYPE, SettlementNotificationPayload};
