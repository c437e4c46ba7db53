//! TOML file configuration structures.
//!
//! These structs directly map to the `mpqr-config.toml` file format.

use mpqr_sdk::config::QrEndpointTopology;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub mercado_pago: MercadoPagoConfig,
    #[serde(default)]
    pub notifications: Option<NotificationsConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Externally reachable base URL, used for status poll and webhook URLs.
    pub public_base_url: Url,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Provider account section.
///
/// Identifiers may be left empty; operations needing them then fail with a
/// configuration error instead of calling the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MercadoPagoConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub collector_id: String,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub pos_id: String,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub topology: QrEndpointTopology,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Secret for verifying `x-signature` on webhooks. Unverified when absent.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Overrides `{public_base_url}/webhooks/mercado-pago`.
    #[serde(default)]
    pub notification_url: Option<Url>,
    /// Overrides the provider API host.
    #[serde(default)]
    pub base_url: Option<Url>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_currency() -> String {
    "ARS".to_string()
}

/// Downstream settlement notification section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub url: Url,
    /// Secret key for signing notification bodies.
    pub secret: String,
}
