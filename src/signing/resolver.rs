//! Signing path resolution
//!
//! Walks shared-address member trees down to whoever can authorize a given
//! (address, signing path): a local key, a remote device, or a hidden
//! commitment.

use crate::config::WalletConfig;
use crate::core::{KeyDerivation, SignerClassification, SigningPath};
use crate::storage::{DefinitionStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Resolution failures that the caller can recover from
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Wallet {wallet} owning {address} is not approved yet")]
    WalletNotApproved { address: String, wallet: String },
    #[error("Definition of {address} nests deeper than {limit} levels")]
    DefinitionTooDeep { address: String, limit: usize },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Classifies signing paths against the current store state.
///
/// Nothing is cached; wallet approval and memberships may change between
/// calls.
#[derive(Clone)]
pub struct PathResolver {
    store: Arc<dyn DefinitionStore>,
    config: Arc<WalletConfig>,
}

impl PathResolver {
    pub fn new(store: Arc<dyn DefinitionStore>, config: Arc<WalletConfig>) -> Self {
        Self { store, config }
    }

    pub async fn resolve(
        &self,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<SignerClassification, ResolveError> {
        self.resolve_with_fallback(address, signing_path, None).await
    }

    /// Resolve with a device to fall back to when the path leaves what this
    /// node knows about.
    ///
    /// # Panics
    ///
    /// Panics when the store holds more than one owned row for the pair or
    /// more than one member prefix; definitions are immutable once
    /// committed, so either means corrupted state.
    pub async fn resolve_with_fallback(
        &self,
        address: &str,
        signing_path: &SigningPath,
        fallback_device: Option<&str>,
    ) -> Result<SignerClassification, ResolveError> {
        let mut address = address.to_string();
        let mut signing_path = signing_path.clone();
        let mut fallback = fallback_device.map(str::to_string);
        let limit = self.config.max_definition_depth;

        for _ in 0..=limit {
            let owned = self
                .store
                .owned_address_by_signing_path(&address, &signing_path)
                .await?;
            if owned.len() > 1 {
                panic!(
                    "{} owned rows for address {} at {}",
                    owned.len(),
                    address,
                    signing_path
                );
            }
            if let Some(row) = owned.into_iter().next() {
                if row.full_approval_date.is_none() {
                    return Err(ResolveError::WalletNotApproved {
                        address,
                        wallet: row.wallet,
                    });
                }
                if !self.config.is_local_device(&row.device_address) {
                    return Ok(SignerClassification::Remote {
                        device_address: row.device_address,
                    });
                }
                return Ok(SignerClassification::Local(KeyDerivation {
                    address,
                    wallet: row.wallet,
                    account: row.account,
                    is_change: row.is_change,
                    address_index: row.address_index,
                }));
            }

            let members = self
                .store
                .shared_memberships_by_prefix(&address, &signing_path)
                .await?;
            if members.len() > 1 {
                panic!(
                    "{} member prefixes of {} match {}",
                    members.len(),
                    address,
                    signing_path
                );
            }
            let Some(member) = members.into_iter().next() else {
                return Ok(match fallback {
                    Some(device_address) => SignerClassification::Remote { device_address },
                    None => SignerClassification::Unknown,
                });
            };

            if member.is_hidden_commitment() {
                return Ok(SignerClassification::HiddenCommitment {
                    is_local: self.config.is_local_device(&member.device_address),
                });
            }

            // Memberships are matched by prefix, so the remainder always exists
            let relative = signing_path
                .relative_to(&member.signing_path)
                .unwrap_or_default();
            log::trace!(
                "{} {} -> member {} {}",
                address,
                signing_path,
                member.address,
                relative
            );
            // Only the enclosing member's device may answer for an unknown address
            fallback = (!self.config.is_local_device(&member.device_address))
                .then(|| member.device_address.clone());
            address = member.address;
            signing_path = relative;
        }

        Err(ResolveError::DefinitionTooDeep { address, limit })
    }
}
