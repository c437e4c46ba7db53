use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Production API host. The sandbox flag currently resolves here as well.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";

/// Timeout applied to every provider call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Shape of the QR seller order endpoint.
///
/// Some deployments register the point of sale under a store, others
/// address it directly under the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrEndpointTopology {
    /// `/collectors/{collector}/stores/{store}/pos/{pos}/qrs`
    #[default]
    CollectorStorePos,
    /// `/collectors/{collector}/pos/{pos}/qrs`
    CollectorPos,
}

/// Credentials and identifiers used to talk to the provider.
#[derive(Clone)]
pub struct PaymentOrderCredentials {
    /// Bearer token from the provider's developer portal.
    pub access_token: String,
    /// Numeric account identifier used in QR order URLs.
    pub collector_id: String,
    /// Store receiving the QR payments. Only used by
    /// [`QrEndpointTopology::CollectorStorePos`].
    pub store_id: Option<String>,
    /// External id of the point of sale the QR is registered on.
    pub pos_id: String,
    pub sandbox: bool,
    /// Per-call timeout.
    pub timeout: Duration,
    /// URL the provider calls when a QR order changes.
    pub notification_url: Option<Url>,
    pub topology: QrEndpointTopology,
    /// Overrides the host derived from `sandbox`. A path prefix such as
    /// `https://proxy.internal/mp/` is kept in front of every endpoint.
    pub base_url: Option<Url>,
}

/// The required identifiers that are empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing provider configuration fields: {}", .0.join(", "))]
pub struct MissingCredentials(pub Vec<&'static str>);

impl PaymentOrderCredentials {
    /// Create credentials for the default store-scoped topology.
    pub fn new(
        access_token: impl Into<String>,
        collector_id: impl Into<String>,
        store_id: impl Into<String>,
        pos_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            collector_id: collector_id.into(),
            store_id: Some(store_id.into()),
            pos_id: pos_id.into(),
            sandbox: false,
            timeout: DEFAULT_TIMEOUT,
            notification_url: None,
            topology: QrEndpointTopology::CollectorStorePos,
            base_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_notification_url(mut self, url: Url) -> Self {
        self.notification_url = Some(url);
        self
    }

    /// Switch to the collector/pos topology, dropping the store id.
    pub fn without_store(mut self) -> Self {
        self.store_id = None;
        self.topology = QrEndpointTopology::CollectorPos;
        self
    }

    /// Check that every identifier needed to create an order is present.
    ///
    /// Reports all missing fields at once, in a stable order.
    pub fn validate(&self) -> Result<(), MissingCredentials> {
        let mut missing = Vec::new();
        if is_blank(&self.access_token) {
            missing.push("access_token");
        }
        if is_blank(&self.collector_id) {
            missing.push("collector_id");
        }
        if self.topology == QrEndpointTopology::CollectorStorePos
            && self.store_id.as_deref().is_none_or(is_blank)
        {
            missing.push("store_id");
        }
        if is_blank(&self.pos_id) {
            missing.push("pos_id");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingCredentials(missing))
        }
    }

    /// Base URL for API calls.
    ///
    /// The sandbox flag is consulted here, but the provider does not expose a
    /// separate sandbox host for these endpoints, so both modes resolve to
    /// [`DEFAULT_API_BASE_URL`] unless `base_url` overrides it.
    #[allow(clippy::if_same_then_else)]
    pub fn api_base_url(&self) -> Result<Url, url::ParseError> {
        if let Some(url) = &self.base_url {
            return Ok(url.clone());
        }
        let host = if self.sandbox {
            DEFAULT_API_BASE_URL
        } else {
            DEFAULT_API_BASE_URL
        };
        Url::parse(host)
    }

    /// Path segments of the QR seller order endpoint for the configured
    /// topology.
    pub fn qr_order_segments(&self) -> Vec<&str> {
        let mut segments = vec!["instore", "orders", "qr", "seller", "collectors"];
        segments.push(self.collector_id.as_str());
        if let (QrEndpointTopology::CollectorStorePos, Some(store)) =
            (self.topology, self.store_id.as_deref())
        {
            segments.extend(["stores", store]);
        }
        segments.extend(["pos", self.pos_id.as_str(), "qrs"]);
        segments
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl std::fmt::Debug for PaymentOrderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrderCredentials")
            .field("access_token", &"<redacted>")
            .field("collector_id", &self.collector_id)
            .field("store_id", &self.store_id)
            .field("pos_id", &self.pos_id)
            .field("sandbox", &self.sandbox)
            .field("timeout", &self.timeout)
            .field("notification_url", &self.notification_url)
            .field("topology", &self.topology)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PaymentOrderCredentials {
        PaymentOrderCredentials::new("APP_USR-token", "123456", "STORE1", "POS1")
    }

    #[test]
    fn test_complete_credentials_validate() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_every_missing_field_is_reported() {
        let creds = PaymentOrderCredentials::new("", " ", "", "");
        let err = creds.validate().unwrap_err();
        assert_eq!(
            err.0,
            vec!["access_token", "collector_id", "store_id", "pos_id"]
        );
        assert_eq!(
            err.to_string(),
            "missing provider configuration fields: access_token, collector_id, store_id, pos_id"
        );
    }

    #[test]
    fn test_store_not_required_without_store_topology() {
        let creds = complete().without_store();
        assert!(creds.validate().is_ok());
        assert_eq!(
            creds.qr_order_segments().join("/"),
            "instore/orders/qr/seller/collectors/123456/pos/POS1/qrs"
        );
    }

    #[test]
    fn test_store_topology_path() {
        assert_eq!(
            complete().qr_order_segments().join("/"),
            "instore/orders/qr/seller/collectors/123456/stores/STORE1/pos/POS1/qrs"
        );
    }

    #[test]
    fn test_sandbox_resolves_to_same_host() {
        let mut creds = complete();
        let live = creds.api_base_url().unwrap();
        creds.sandbox = true;
        assert_eq!(creds.api_base_url().unwrap(), live);
        assert_eq!(live.as_str(), "https://api.mercadopago.com/");
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", complete());
        assert!(!rendered.contains("APP_USR-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
