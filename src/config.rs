//! Wallet configuration
//!
//! The local device identity and the tunables of coin selection and
//! signing. Passed explicitly to every component.

use crate::core::{MAX_FEE, SIG_LENGTH, TYPICAL_FEE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Wallet configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Address of this device
    pub device_address: String,
    /// Fee margin for base-asset payments and the fee-address pass
    pub typical_fee: u64,
    /// Slack above the target tolerated by the most-funded pre-filter
    pub max_fee: u64,
    /// Length of a key signature
    pub signature_length: usize,
    /// Maximum nesting of shared-address definitions followed
    pub max_definition_depth: usize,
    /// Maximum rounds of the cosigner closure
    pub max_closure_rounds: usize,
    /// Bound on waiting for a remote signature; `None` waits forever
    pub remote_sign_timeout_secs: Option<u64>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            device_address: String::new(),
            typical_fee: TYPICAL_FEE,
            max_fee: MAX_FEE,
            signature_length: SIG_LENGTH,
            max_definition_depth: 64,
            max_closure_rounds: 64,
            remote_sign_timeout_secs: None,
        }
    }
}

impl WalletConfig {
    /// Default configuration for the given device
    pub fn for_device(device_address: &str) -> Self {
        Self {
            device_address: device_address.to_string(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: WalletConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_address.is_empty() {
            return Err(ConfigError::Invalid(
                "device_address must be set".to_string(),
            ));
        }
        if self.signature_length == 0 {
            return Err(ConfigError::Invalid(
                "signature_length must be positive".to_string(),
            ));
        }
        if self.max_definition_depth == 0 || self.max_closure_rounds == 0 {
            return Err(ConfigError::Invalid(
                "recursion caps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn remote_sign_timeout(&self) -> Option<Duration> {
        self.remote_sign_timeout_secs.map(Duration::from_secs)
    }

    pub fn is_local_device(&self, device_address: &str) -> bool {
        self.device_address == device_address
    }
}
