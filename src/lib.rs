//! DAG Wallet: the authorization core of a wallet for a DAG-based ledger
//!
//! This crate works out who has to authorize a payment and collects the
//! authorizations:
//! - Signing path resolution through nested shared-address definitions
//! - Signing path enumeration with key and commitment proofs
//! - Funded address selection and cosigner closure
//! - Local, remote (peer device) and commitment-proof signing
//! - Payment orchestration around an external composer, with private
//!   chains forwarded before commit
//! - An in-memory definition store with JSON snapshots
//!
//! # Example
//!
//! ```rust
//! use dag_wallet::core::SigningPath;
//! use dag_wallet::signing::PathResolver;
//! use dag_wallet::storage::{MemoryStore, OwnedAddressRecord, StoreSnapshot};
//! use dag_wallet::WalletConfig;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut tables = StoreSnapshot::new();
//! tables
//!     .add_wallet("w1", true)
//!     .add_wallet_signing_path("w1", SigningPath::root(), "0LOCAL")
//!     .add_owned_address(OwnedAddressRecord {
//!         address: "A1".to_string(),
//!         wallet: "w1".to_string(),
//!         account: 0,
//!         is_change: false,
//!         address_index: 0,
//!         definition: json!(["sig", {"pubkey": "..."}]),
//!     });
//!
//! let store = Arc::new(MemoryStore::new(tables));
//! let config = Arc::new(WalletConfig::for_device("0LOCAL"));
//! let resolver = PathResolver::new(store, config);
//!
//! let signer = resolver.resolve("A1", &SigningPath::root()).await.unwrap();
//! println!("A1 is signed by {}", signer);
//! # });
//! ```

pub mod cli;
pub mod compose;
pub mod config;
pub mod context;
pub mod core;
pub mod crypto;
pub mod network;
pub mod payment;
pub mod selection;
pub mod signing;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use compose::{Composer, ComposerKind};
pub use config::WalletConfig;
pub use context::WalletContext;
pub use core::{SignerClassification, SigningPath};
pub use crypto::{KeyPair, KeyringSigner};
pub use network::{DeviceMessage, DeviceNetwork, WalletEvent};
pub use payment::{PaymentError, PaymentOptions, PaymentOrchestrator};
pub use signing::{LocalSigner, PathResolver, Signer, SigningCoordinator};
pub use storage::{DefinitionStore, MemoryStore};
