//! Core data model
//!
//! This module contains the types every other component speaks:
//! - Signing paths (positions inside shared-address definitions)
//! - Signer classifications and key derivation coordinates
//! - Funded addresses, outputs, asset properties
//! - Protocol constants (signature length, typical fee)

pub mod path;
pub mod types;

pub use path::{PathError, SigningPath, ROOT_MARKER, SEGMENT_SEPARATOR};
pub use types::{
    normalize_asset, AssetInfo, FundedAddress, KeyDerivation, Output, PrivateChain, ProofKind,
    SignerClassification, SigningPaths, BASE_ASSET, MAX_FEE, REFUSED_SIGNATURE, SIG_LENGTH,
    TYPICAL_FEE,
};
