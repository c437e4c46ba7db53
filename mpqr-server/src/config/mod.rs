//! Configuration module for mpqr-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, MercadoPagoConfig as FileMercadoPagoConfig};
use crate::config::runtime::{MercadoPagoConfig, ServerConfig, SharedConfig};
use compact_str::CompactString;
use mpqr_core::config::{ConfigStore, NotificationTarget};
use mpqr_sdk::config::PaymentOrderCredentials;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Path the provider posts notifications to.
pub const WEBHOOK_PATH: &str = "/webhooks/mercado-pago";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub mercado_pago: MercadoPagoConfig,
    pub notifications: Option<NotificationTarget>,
}

impl LoadedConfig {
    /// Wrap each section in its own [`ConfigStore`].
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: ConfigStore::new(self.server),
            mercado_pago: ConfigStore::new(self.mercado_pago),
            notifications: ConfigStore::new(self.notifications),
        }
    }

    /// Replace every section of `shared` with this configuration.
    pub async fn apply_to(self, shared: &SharedConfig) {
        shared.server.update(self.server).await;
        shared.mercado_pago.update(self.mercado_pago).await;
        shared.notifications.update(self.notifications).await;
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        parse_config(&config_content, self.listen_override)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn parse_config(
    content: &str,
    listen_override: Option<SocketAddr>,
) -> Result<LoadedConfig, ConfigError> {
    let mut file_config: FileConfig = toml::from_str(content)?;

    if let Some(listen) = listen_override {
        file_config.server.listen = listen;
    }

    validate(&file_config)?;
    build_loaded_config(file_config)
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let mp = &config.mercado_pago;
    if mp.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "mercado_pago.timeout_secs must be greater than zero".into(),
        ));
    }
    if mp.default_currency.len() != 3
        || !mp.default_currency.chars().all(|c| c.is_ascii_uppercase())
    {
        return Err(ConfigError::ValidationError(format!(
            "mercado_pago.default_currency {:?} is not an ISO 4217 code",
            mp.default_currency
        )));
    }
    if config
        .notifications
        .as_ref()
        .is_some_and(|notifications| notifications.secret.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "notifications.secret must not be empty".into(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let server = ServerConfig {
        listen: file_config.server.listen,
        public_base_url: file_config.server.public_base_url,
    };
    let notification_url = match &file_config.mercado_pago.notification_url {
        Some(url) => url.clone(),
        None => server
            .public_url(WEBHOOK_PATH)
            .map_err(|e| ConfigError::ValidationError(format!("invalid public_base_url: {e}")))?,
    };
    let mercado_pago = convert_mercado_pago(file_config.mercado_pago, notification_url);

    // Incomplete credentials are reported per operation, not at startup.
    if let Err(missing) = mercado_pago.credentials.validate() {
        tracing::warn!(
            error = %missing,
            "Provider credentials incomplete; QR orders cannot be created"
        );
    }

    Ok(LoadedConfig {
        server,
        mercado_pago,
        notifications: file_config
            .notifications
            .map(|n| NotificationTarget::new(n.url, n.secret.into_bytes())),
    })
}

fn convert_mercado_pago(m: FileMercadoPagoConfig, notification_url: Url) -> MercadoPagoConfig {
    let credentials = PaymentOrderCredentials {
        access_token: m.access_token,
        collector_id: m.collector_id,
        store_id: m.store_id,
        pos_id: m.pos_id,
        sandbox: m.sandbox,
        timeout: Duration::from_secs(m.timeout_secs),
        notification_url: Some(notification_url),
        topology: m.topology,
        base_url: m.base_url,
    };
    MercadoPagoConfig {
        credentials,
        default_currency: CompactString::from(m.default_currency),
        webhook_secret: m
            .webhook_secret
            .filter(|secret| !secret.is_empty())
            .map(|secret| secret.into_bytes().into_boxed_slice()),
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[server]
listen = "127.0.0.1:3000"
public_base_url = "https://pay.example.com"

[mercado_pago]
access_token = "APP_USR-123"
collector_id = "123456"
store_id = "STORE1"
pos_id = "POS1"
timeout_secs = 10
"#;

    #[test]
    fn test_notification_url_defaults_to_webhook_route() {
        let loaded = parse_config(CONFIG, None).unwrap();
        let credentials = &loaded.mercado_pago.credentials;
        assert_eq!(
            credentials.notification_url.as_ref().map(Url::as_str),
            Some("https://pay.example.com/webhooks/mercado-pago")
        );
        assert_eq!(credentials.timeout, Duration::from_secs(10));
        assert!(credentials.validate().is_ok());
        assert!(loaded.mercado_pago.webhook_secret.is_none());
        assert!(loaded.notifications.is_none());
    }

    #[test]
    fn test_listen_override() {
        let listen: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        let loaded = parse_config(CONFIG, Some(listen)).unwrap();
        assert_eq!(loaded.server.listen, listen);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero_timeout = CONFIG.replace("timeout_secs = 10", "timeout_secs = 0");
        assert!(matches!(
            parse_config(&zero_timeout, None),
            Err(ConfigError::ValidationError(_))
        ));

        let bad_currency = format!("{CONFIG}default_currency = \"pesos\"\n");
        assert!(matches!(
            parse_config(&bad_currency, None),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_incomplete_credentials_still_load() {
        let partial = CONFIG.replace("access_token = \"APP_USR-123\"", "");
        let loaded = parse_config(&partial, None).unwrap();
        assert!(loaded.mercado_pago.credentials.validate().is_err());
    }

    #[tokio::test]
    async fn test_reload_replaces_sections() {
        let shared = parse_config(CONFIG, None).unwrap().into_shared();
        let mut versions = shared.mercado_pago.subscribe();

        let updated = CONFIG.replace("POS1", "POS2");
        parse_config(&updated, None)
            .unwrap()
            .apply_to(&shared)
            .await;

        versions.changed().await.unwrap();
        assert_eq!(shared.mercado_pago.snapshot().await.credentials.pos_id, "POS2");
    }
}
