//! Definition store interface
//!
//! The relational query surface the authorization core reads from:
//! owned addresses and their wallets, shared-address member trees,
//! definitions, spendable outputs and confirmed definition changes.

use crate::core::{AssetInfo, FundedAddress, SigningPath};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// An owned address joined with its wallet and one wallet signing path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedAddressRow {
    pub wallet: String,
    pub account: u32,
    pub is_change: bool,
    pub address_index: u32,
    /// Set once every cosigner of the wallet approved it
    pub full_approval_date: Option<DateTime<Utc>>,
    /// Device controlling the wallet signing path
    pub device_address: String,
}

/// One member of a shared address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRow {
    /// Path of the member inside the shared address definition
    pub signing_path: SigningPath,
    /// Member address; empty for a hidden-commitment leaf
    pub address: String,
    /// Device holding the member's authorization
    pub device_address: String,
}

impl MembershipRow {
    pub fn is_hidden_commitment(&self) -> bool {
        self.address.is_empty()
    }
}

/// Optional restriction of queries to a set of trusted devices.
///
/// An empty set means no restriction.
pub fn device_allowed(allowed_devices: Option<&[String]>, device_address: &str) -> bool {
    match allowed_devices {
        Some(devices) if !devices.is_empty() => devices.iter().any(|d| d == device_address),
        _ => true,
    }
}

/// Query surface of the persistent definition store
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Owned address rows whose wallet-level signing path equals `signing_path`
    async fn owned_address_by_signing_path(
        &self,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<OwnedAddressRow>, StoreError>;

    /// Members of `shared_address` whose path is an ancestor of (or equal to)
    /// `signing_path`
    async fn shared_memberships_by_prefix(
        &self,
        shared_address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<MembershipRow>, StoreError>;

    /// Wallet signing paths of an owned address
    async fn owned_signing_paths(
        &self,
        address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<SigningPath>, StoreError>;

    /// All members of a shared address
    async fn shared_memberships(
        &self,
        shared_address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<MembershipRow>, StoreError>;

    /// Definitions recorded for the address as owned or shared (distinct)
    async fn definitions(&self, address: &str) -> Result<Vec<Value>, StoreError>;

    /// Per-address totals of stable, good, unspent outputs of a wallet in
    /// `asset` (`None` is the base asset), excluding addresses with a
    /// pending definition change
    async fn funded_totals(
        &self,
        wallet: &str,
        asset: Option<&str>,
    ) -> Result<Vec<FundedAddress>, StoreError>;

    /// Distinct members of the given shared addresses that are under our
    /// control (owned, or themselves shared) and whose own definition is not
    /// finalized on the ledger
    async fn unfinalized_member_addresses(
        &self,
        shared_addresses: &[String],
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<String>, StoreError>;

    /// Asset properties
    async fn read_asset(&self, asset: &str) -> Result<Option<AssetInfo>, StoreError>;
}
