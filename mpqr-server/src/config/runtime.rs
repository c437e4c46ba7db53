//! Validated runtime configuration.

use compact_str::CompactString;
use mpqr_core::config::{ConfigStore, NotificationTarget};
use mpqr_sdk::config::PaymentOrderCredentials;
use std::net::SocketAddr;
use url::Url;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub public_base_url: Url,
}

impl ServerConfig {
    /// Absolute URL for a path on this server.
    pub fn public_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.public_base_url.join(path)
    }
}

#[derive(Clone)]
pub struct MercadoPagoConfig {
    /// Injected into every lifecycle call.
    pub credentials: PaymentOrderCredentials,
    pub default_currency: CompactString,
    pub webhook_secret: Option<Box<[u8]>>,
}

impl std::fmt::Debug for MercadoPagoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoConfig")
            .field("credentials", &self.credentials)
            .field("default_currency", &self.default_currency)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Shared configuration state with a separate store for each section.
///
/// SIGHUP replaces each section independently; readers take snapshots.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: ConfigStore<ServerConfig>,
    pub mercado_pago: ConfigStore<MercadoPagoConfig>,
    /// Also read by the settlement notifier.
    pub notifications: ConfigStore<Option<NotificationTarget>>,
}
