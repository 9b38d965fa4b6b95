//! Shared handles every component of the authorization core works with

use crate::config::WalletConfig;
use crate::network::{DeviceNetwork, EventBus};
use crate::signing::SignatureRequests;
use crate::storage::DefinitionStore;
use std::sync::Arc;

/// Store, network, configuration and the pending signature table
#[derive(Clone)]
pub struct WalletContext {
    pub config: Arc<WalletConfig>,
    pub store: Arc<dyn DefinitionStore>,
    pub network: Arc<dyn DeviceNetwork>,
    pub requests: Arc<SignatureRequests>,
    pub events: EventBus,
}

impl WalletContext {
    pub fn new(
        config: WalletConfig,
        store: Arc<dyn DefinitionStore>,
        network: Arc<dyn DeviceNetwork>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            network,
            requests: Arc::new(SignatureRequests::new()),
            events: EventBus::default(),
        }
    }
}
