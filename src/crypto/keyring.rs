//! In-memory keyring
//!
//! Holds the secp256k1 keys of this device's wallets by derivation
//! coordinates and signs digests with them.

use crate::core::KeyDerivation;
use crate::crypto::keys::{KeyError, KeyPair};
use crate::signing::{LocalSigner, SigningError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

type Coordinates = (String, u32, bool, u32);

fn coordinates(key: &KeyDerivation) -> Coordinates {
    (
        key.wallet.clone(),
        key.account,
        key.is_change,
        key.address_index,
    )
}

/// Keys held by this device
#[derive(Debug, Default)]
pub struct KeyringSigner {
    keys: HashMap<Coordinates, KeyPair>,
}

impl KeyringSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &KeyDerivation, pair: KeyPair) {
        self.keys.insert(coordinates(key), pair);
    }

    /// Import a hex-encoded private key
    pub fn import_hex(&mut self, key: &KeyDerivation, private_key_hex: &str) -> Result<(), KeyError> {
        let pair = KeyPair::from_private_key_hex(private_key_hex)?;
        self.insert(key, pair);
        Ok(())
    }

    pub fn get(&self, key: &KeyDerivation) -> Option<&KeyPair> {
        self.keys.get(&coordinates(key))
    }

    /// Single-key definition of the address derived at `key`
    pub fn definition(&self, key: &KeyDerivation) -> Option<Value> {
        self.get(key)
            .map(|pair| json!(["sig", {"pubkey": pair.public_key_base64()}]))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl LocalSigner for KeyringSigner {
    async fn sign(&self, key: &KeyDerivation, digest: &[u8]) -> Result<String, SigningError> {
        let pair = self.get(key).ok_or_else(|| {
            SigningError::LocalSigningFailed(format!(
                "no key for {}/{}/{}/{}",
                key.wallet,
                key.account,
                u8::from(key.is_change),
                key.address_index
            ))
        })?;
        pair.sign_base64(digest)
            .map_err(|e| SigningError::LocalSigningFailed(e.to_string()))
    }
}
