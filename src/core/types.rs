//! Shared data model of the authorization core

use crate::core::path::SigningPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a key signature as stored in a unit (base64 of a 64-byte
/// compact ECDSA signature)
pub const SIG_LENGTH: usize = 88;

/// Fee margin added when estimating base-asset spends
pub const TYPICAL_FEE: u64 = 1000;

/// Slack allowed above the target by the most-funded pre-filter
pub const MAX_FEE: u64 = 20_000;

/// Sentinel a peer returns instead of a signature when it refuses to sign
pub const REFUSED_SIGNATURE: &str = "[refused]";

/// Name callers may use for the base asset
pub const BASE_ASSET: &str = "base";

/// Derivation coordinates of a locally held key
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDerivation {
    pub address: String,
    pub wallet: String,
    pub account: u32,
    pub is_change: bool,
    pub address_index: u32,
}

/// Who can authorize a given (address, signing path)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignerClassification {
    /// A key held by a wallet on this device
    Local(KeyDerivation),
    /// A key held by another device
    Remote { device_address: String },
    /// A hidden-commitment leaf; proven by revealing a committed alternative
    HiddenCommitment { is_local: bool },
    /// No signer could be located for the path
    Unknown,
}

impl fmt::Display for SignerClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerClassification::Local(key) => write!(
                f,
                "local key {}/{}/{}/{}",
                key.wallet,
                key.account,
                u8::from(key.is_change),
                key.address_index
            ),
            SignerClassification::Remote { device_address } => {
                write!(f, "remote device {}", device_address)
            }
            SignerClassification::HiddenCommitment { is_local } => {
                write!(f, "hidden commitment (local: {})", is_local)
            }
            SignerClassification::Unknown => f.write_str("unknown"),
        }
    }
}

/// What has to be supplied at a leaf of a definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// A signature by a key
    Key,
    /// A proof revealing a committed alternative definition
    Commitment,
}

/// Every leaf path of an address definition, keyed by path
pub type SigningPaths = std::collections::BTreeMap<SigningPath, ProofKind>;

/// An address with spendable, stable, unconflicted funds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedAddress {
    pub address: String,
    pub total: u64,
}

impl FundedAddress {
    pub fn new(address: impl Into<String>, total: u64) -> Self {
        Self {
            address: address.into(),
            total,
        }
    }
}

/// Properties of an asset relevant to payment composition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset: String,
    /// Indivisible asset issued in fixed denominations
    pub fixed_denominations: bool,
    /// Outputs are hidden; payloads travel out of band
    pub is_private: bool,
}

/// A payment destination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub amount: u64,
}

impl Output {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Ordered disclosure chain of a private payment. Opaque to this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateChain(pub Vec<serde_json::Value>);

/// Normalize a caller-provided asset id: `None` and `"base"` both mean the
/// base asset
pub fn normalize_asset(asset: Option<&str>) -> Option<&str> {
    asset.filter(|a| *a != BASE_ASSET)
}
