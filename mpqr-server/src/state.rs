//! Application state shared across all request handlers.

use crate::config::runtime::{MercadoPagoConfig, SharedConfig};
use mpqr_core::LifecycleManager;
use mpqr_core::store::TransactionStore;
use mpqr_sdk::client::MercadoPagoClient;
use std::sync::Arc;

/// Store handle used by the lifecycle manager.
pub type DynTransactionStore = Arc<dyn TransactionStore>;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Order lifecycle for every integration surface.
    pub lifecycle: Arc<LifecycleManager<DynTransactionStore>>,
    /// Provider client, also used directly to resolve webhook resources.
    pub client: MercadoPagoClient,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(
        lifecycle: LifecycleManager<DynTransactionStore>,
        client: MercadoPagoClient,
        config: SharedConfig,
    ) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            client,
            config,
        }
    }

    /// Snapshot of the provider section, taken once per request.
    pub async fn mercado_pago(&self) -> MercadoPagoConfig {
        self.config.mercado_pago.snapshot().await
    }
}
