//! Shared types for the Mercado Pago QR order integration.
//!
//! - [`config`]: provider credentials injected into every core call.
//! - [`objects`]: wire types, both for the provider API and for the HTTP
//!   surface exposed to checkout frontends, point-of-sale terminals and
//!   downstream consumers.
//! - [`signature`]: webhook signature verification and notification signing.
//! - `client` (feature `client`): the stateless provider API client.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod objects;
pub mod signature;
