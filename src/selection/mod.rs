//! Coin selection and cosigner discovery

pub mod cosigners;
pub mod funded;

pub use cosigners::CosignerClosureResolver;
pub use funded::{
    filter_most_funded, order_funded, read_wallet_funded_addresses, FundedAddressSelector,
    FundingSource,
};

use crate::compose::ComposeError;
use crate::storage::StoreError;
use thiserror::Error;

/// Selection errors
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Composer error: {0}")]
    Compose(#[from] ComposeError),
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
    #[error("Cosigner closure did not converge after {rounds} rounds")]
    ClosureDidNotConverge { rounds: usize },
}
