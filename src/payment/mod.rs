//! Payments
//!
//! Request validation, private chain forwarding and the orchestrator driving
//! selection, signing and composition.

pub mod forwarder;
pub mod orchestrator;
pub mod request;

pub use forwarder::{CosignerScope, PrivatePaymentForwarder};
pub use orchestrator::{FundingPlan, PaymentOrchestrator};
pub use request::PaymentOptions;

use crate::compose::ComposeError;
use crate::selection::SelectionError;
use crate::storage::StoreError;
use thiserror::Error;

/// Payment errors. Messages are meant for the user.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("There are no funded addresses")]
    NoFundedAddresses,
    #[error("No notes to pay fees")]
    NoFeeAddresses,
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
    #[error("Not enough funds: {0}")]
    NotEnoughFunds(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Compose(ComposeError),
}
