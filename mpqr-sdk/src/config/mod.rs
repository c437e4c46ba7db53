//! Provider credentials for the QR order integration.
//!
//! [`PaymentOrderCredentials`] is the validated runtime form. It is owned by
//! the host configuration and passed by reference into every core call; the
//! file format and reload handling live in the server crate.

mod credentials;

pub use credentials::{
    DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT, MissingCredentials, PaymentOrderCredentials,
    QrEndpointTopology,
};
