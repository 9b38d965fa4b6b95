//! Composer boundary
//!
//! The composer assembles inputs and outputs into a unit, asks the signer for
//! every authentifier, runs the pre-commit hook and saves the unit. This crate
//! only describes what it hands over and what it gets back.

use crate::core::{AssetInfo, FundedAddress, Output, PrivateChain};
use crate::network::NetworkError;
use crate::signing::{Signer, SigningError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Composition errors
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Not enough funds: {0}")]
    NotEnoughFunds(String),
    #[error("Pre-commit failed: {0}")]
    PreCommit(#[from] PreCommitError),
    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),
    #[error("Composition failed: {0}")]
    Failed(String),
}

/// Errors raised by a pre-commit hook; any of them aborts the commit
#[derive(Error, Debug)]
pub enum PreCommitError {
    #[error("Private payment has no private elements")]
    MissingPrivateElements,
    #[error("Forwarding private chains failed: {0}")]
    Forwarding(#[from] NetworkError),
}

/// Composer backend, chosen by asset properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKind {
    /// Base asset
    Base,
    /// Divisible asset
    DivisibleAsset,
    /// Indivisible asset with fixed denominations
    IndivisibleAsset,
}

impl ComposerKind {
    pub fn for_asset(asset: Option<&AssetInfo>) -> Self {
        match asset {
            None => ComposerKind::Base,
            Some(info) if info.fixed_denominations => ComposerKind::IndivisibleAsset,
            Some(_) => ComposerKind::DivisibleAsset,
        }
    }
}

impl fmt::Display for ComposerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComposerKind::Base => "base",
            ComposerKind::DivisibleAsset => "divisible asset",
            ComposerKind::IndivisibleAsset => "indivisible asset",
        };
        f.write_str(name)
    }
}

/// Runs after every authentifier is in place and before the unit is saved
#[async_trait]
pub trait PreCommitHook: Send + Sync {
    async fn before_commit(
        &self,
        recipient_chains: Option<&[PrivateChain]>,
        cosigner_chains: Option<&[PrivateChain]>,
    ) -> Result<(), PreCommitError>;
}

/// Everything the composer needs for one payment
#[derive(Clone)]
pub struct ComposeParams {
    /// `None` for the base asset
    pub asset: Option<String>,
    pub available_paying_addresses: Vec<String>,
    /// Base-asset addresses paying the fee of an asset payment
    pub available_fee_paying_addresses: Vec<String>,
    pub signing_addresses: Vec<String>,
    pub signer: Arc<dyn Signer>,
    /// Base-asset outputs
    pub outputs: Vec<Output>,
    pub asset_outputs: Vec<Output>,
    pub to_address: Option<String>,
    pub amount: Option<u64>,
    pub change_address: Option<String>,
    pub send_all: bool,
    pub tolerance_plus: Option<u64>,
    pub tolerance_minus: Option<u64>,
    pub messages: Vec<Value>,
    pub pre_commit: Option<Arc<dyn PreCommitHook>>,
}

impl fmt::Debug for ComposeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeParams")
            .field("asset", &self.asset)
            .field("available_paying_addresses", &self.available_paying_addresses)
            .field(
                "available_fee_paying_addresses",
                &self.available_fee_paying_addresses,
            )
            .field("signing_addresses", &self.signing_addresses)
            .field("outputs", &self.outputs)
            .field("asset_outputs", &self.asset_outputs)
            .field("to_address", &self.to_address)
            .field("amount", &self.amount)
            .field("send_all", &self.send_all)
            .field("pre_commit", &self.pre_commit.is_some())
            .finish_non_exhaustive()
    }
}

/// A saved unit and the private chains produced for it
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOutcome {
    pub unit: String,
    pub recipient_chains: Option<Vec<PrivateChain>>,
    pub cosigner_chains: Option<Vec<PrivateChain>>,
}

/// Transaction composer
#[async_trait]
pub trait Composer: Send + Sync {
    /// Funded addresses among `addresses`, sorted for paying `estimated_amount`
    async fn read_sorted_funded_addresses(
        &self,
        asset: Option<&str>,
        addresses: &[String],
        estimated_amount: u64,
    ) -> Result<Vec<FundedAddress>, ComposeError>;

    /// Compose, sign and save a unit. The pre-commit hook must succeed
    /// before anything is saved.
    async fn compose_and_save(
        &self,
        kind: ComposerKind,
        params: ComposeParams,
    ) -> Result<ComposeOutcome, ComposeError>;
}
