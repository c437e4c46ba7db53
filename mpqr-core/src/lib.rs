#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! QR order lifecycle for provider-hosted in-store payments.
//!
//! The [`LifecycleManager`](lifecycle::LifecycleManager) drives each local
//! transaction through order creation, status resolution and settlement,
//! using the [`OrderCreator`](order_creator::OrderCreator) and
//! [`StatusResolver`](status_resolver::StatusResolver) on top of the SDK's
//! provider client.

pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod framework;
pub mod lifecycle;
pub mod locks;
pub mod order_creator;
pub mod processors;
pub mod qr_order;
pub mod status_resolver;
pub mod store;

pub use error::QrError;
pub use lifecycle::LifecycleManager;
