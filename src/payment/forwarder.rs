//! Private payment forwarding
//!
//! Private assets are only spendable by whoever holds the disclosure chains,
//! so the chains reach the recipient and the cosigners before the unit is
//! saved.

use crate::compose::{PreCommitError, PreCommitHook};
use crate::core::PrivateChain;
use crate::network::DeviceNetwork;
use async_trait::async_trait;
use std::sync::Arc;

/// Who else holds the paying addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosignerScope {
    /// Other members of the paying wallet
    Wallet(String),
    /// Other members of the paying shared addresses
    Addresses(Vec<String>),
}

/// Pre-commit hook delivering private chains
pub struct PrivatePaymentForwarder {
    network: Arc<dyn DeviceNetwork>,
    recipient_device: Option<String>,
    cosigners: CosignerScope,
}

impl PrivatePaymentForwarder {
    pub fn new(
        network: Arc<dyn DeviceNetwork>,
        recipient_device: Option<String>,
        cosigners: CosignerScope,
    ) -> Self {
        Self {
            network,
            recipient_device,
            cosigners,
        }
    }

    async fn send_to_recipient(&self, chains: &[PrivateChain]) -> Result<(), PreCommitError> {
        match &self.recipient_device {
            Some(device) => {
                log::info!("Sending {} private chains to {}", chains.len(), device);
                self.network.send_private_payments(device, chains).await?;
            }
            // Paying another wallet on this node
            None => {
                log::info!("Forwarding {} private chains to output members", chains.len());
                self.network
                    .forward_private_chains_to_output_members(chains)
                    .await?;
            }
        }
        Ok(())
    }

    async fn send_to_cosigners(&self, chains: &[PrivateChain]) -> Result<(), PreCommitError> {
        match &self.cosigners {
            CosignerScope::Wallet(wallet) => {
                self.network
                    .forward_private_chains_to_wallet_members(chains, std::slice::from_ref(wallet))
                    .await?
            }
            CosignerScope::Addresses(addresses) => {
                self.network
                    .forward_private_chains_to_address_members(chains, addresses)
                    .await?
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PreCommitHook for PrivatePaymentForwarder {
    async fn before_commit(
        &self,
        recipient_chains: Option<&[PrivateChain]>,
        cosigner_chains: Option<&[PrivateChain]>,
    ) -> Result<(), PreCommitError> {
        let (Some(recipient_chains), Some(cosigner_chains)) = (recipient_chains, cosigner_chains)
        else {
            return Err(PreCommitError::MissingPrivateElements);
        };
        self.send_to_recipient(recipient_chains).await?;
        self.send_to_cosigners(cosigner_chains).await
    }
}
