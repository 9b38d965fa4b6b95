//! Outbound dispatch to peer devices
//!
//! The transport itself lives outside this crate; the core only needs to
//! address a device and to fan private chains out to wallet members.

use crate::core::{PrivateChain, SigningPath};
use crate::network::message::DeviceMessage;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Network dispatch errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Messaging surface towards paired devices
#[async_trait]
pub trait DeviceNetwork: Send + Sync {
    /// Deliver a message to one device
    async fn send_to_device(
        &self,
        device_address: &str,
        message: DeviceMessage,
    ) -> Result<(), NetworkError>;

    /// Deliver recipient chains to the members of the output addresses when
    /// the recipient is another wallet on this node
    async fn forward_private_chains_to_output_members(
        &self,
        chains: &[PrivateChain],
    ) -> Result<(), NetworkError>;

    /// Deliver chains to the other members of the given wallets
    async fn forward_private_chains_to_wallet_members(
        &self,
        chains: &[PrivateChain],
        wallets: &[String],
    ) -> Result<(), NetworkError>;

    /// Deliver chains to the other members of the given shared addresses
    async fn forward_private_chains_to_address_members(
        &self,
        chains: &[PrivateChain],
        addresses: &[String],
    ) -> Result<(), NetworkError>;

    /// Offer an unsigned unit to a device for signing
    async fn send_sign_offer(
        &self,
        device_address: &str,
        address: &str,
        signing_path: &SigningPath,
        unsigned_unit: &Value,
        private_payloads: Option<&Value>,
    ) -> Result<(), NetworkError> {
        let message = DeviceMessage::SignOffer {
            address: address.to_string(),
            signing_path: signing_path.clone(),
            unsigned_unit: unsigned_unit.clone(),
            private_payloads: private_payloads.cloned(),
        };
        self.send_to_device(device_address, message).await
    }

    async fn send_private_payments(
        &self,
        device_address: &str,
        chains: &[PrivateChain],
    ) -> Result<(), NetworkError> {
        let message = DeviceMessage::PrivatePayments {
            chains: chains.to_vec(),
            forwarded: false,
        };
        self.send_to_device(device_address, message).await
    }

    async fn send_payment_notification(
        &self,
        device_address: &str,
        unit: &str,
    ) -> Result<(), NetworkError> {
        let message = DeviceMessage::PaymentNotification {
            unit: unit.to_string(),
        };
        self.send_to_device(device_address, message).await
    }
}
