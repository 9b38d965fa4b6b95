//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing and the digest units are signed over
//! - ECDSA key management (secp256k1)
//! - A keyring signing with this device's keys

pub mod hash;
pub mod keyring;
pub mod keys;

pub use hash::{digest_base64, sha256, sha256_hex, unit_hash_to_sign};
pub use keyring::KeyringSigner;
pub use keys::{sign_message, verify_signature, KeyError, KeyPair};
