//! Test fixtures: a sample store, a recording network, a scripted composer
//! and a deterministic local signer.
//!
//! Devices: `0LOCAL` is this device, `0PEER` a paired device.
//!
//! | Address | Kind | Layout |
//! |---|---|---|
//! | A1, A2 | owned by approved wallet w1 | wallet path `r` @ 0LOCAL |
//! | M1 | owned by approved wallet w2 | `r.0` @ 0LOCAL, `r.1` @ 0PEER |
//! | U1 | owned by unapproved wallet w3 | `r` @ 0LOCAL |
//! | S1 | shared | `r.0` A1 @ 0LOCAL, `r.1` B1 @ 0PEER, `r.2` commitment @ 0LOCAL |
//! | S2 | shared | `r.0` S1 @ 0LOCAL, `r.1` commitment @ 0PEER, `r.2` M1 @ 0LOCAL |
//! | S3 | shared | `r.0` P1 @ 0PEER (P1 unknown locally) |

use crate::compose::{ComposeError, ComposeOutcome, ComposeParams, Composer, ComposerKind};
use crate::config::WalletConfig;
use crate::context::WalletContext;
use crate::core::{AssetInfo, FundedAddress, KeyDerivation, PrivateChain, SigningPath};
use crate::network::{DeviceMessage, DeviceNetwork, NetworkError};
use crate::signing::{LocalSigner, SigningError};
use crate::storage::{
    DefinitionStore, MembershipRow, MemoryStore, OwnedAddressRecord, OwnedAddressRow, StoreError,
    StoreSnapshot,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LOCAL: &str = "0LOCAL";
pub const PEER: &str = "0PEER";

pub fn path(s: &str) -> SigningPath {
    SigningPath::parse(s).unwrap()
}

pub fn owned(address: &str, wallet: &str, index: u32) -> OwnedAddressRecord {
    OwnedAddressRecord {
        address: address.to_string(),
        wallet: wallet.to_string(),
        account: 0,
        is_change: false,
        address_index: index,
        definition: json!(["sig", {"pubkey": format!("pub-{}", address)}]),
    }
}

pub fn fixture_snapshot() -> StoreSnapshot {
    let mut tables = StoreSnapshot::new();
    tables
        .add_wallet("w1", true)
        .add_wallet_signing_path("w1", path("r"), LOCAL)
        .add_owned_address(owned("A1", "w1", 0))
        .add_owned_address(owned("A2", "w1", 1))
        .add_wallet("w2", true)
        .add_wallet_signing_path("w2", path("r.0"), LOCAL)
        .add_wallet_signing_path("w2", path("r.1"), PEER)
        .add_owned_address(owned("M1", "w2", 0))
        .add_wallet("w3", false)
        .add_wallet_signing_path("w3", path("r"), LOCAL)
        .add_owned_address(owned("U1", "w3", 0))
        .add_shared_address("S1", json!(["r of set", {"required": 2, "set": []}]))
        .add_member("S1", path("r.0"), "A1", LOCAL)
        .add_member("S1", path("r.1"), "B1", PEER)
        .add_member("S1", path("r.2"), "", LOCAL)
        .add_shared_address("S2", json!(["and", []]))
        .add_member("S2", path("r.0"), "S1", LOCAL)
        .add_member("S2", path("r.1"), "", PEER)
        .add_member("S2", path("r.2"), "M1", LOCAL)
        .add_shared_address("S3", json!(["or", []]))
        .add_member("S3", path("r.0"), "P1", PEER);
    tables
}

pub fn fixture_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(fixture_snapshot()))
}

pub fn test_config() -> WalletConfig {
    WalletConfig::for_device(LOCAL)
}

pub fn test_context(store: Arc<MemoryStore>, network: Arc<RecordingNetwork>) -> WalletContext {
    WalletContext::new(test_config(), store, network)
}

/// Store wrapper counting every query it answers
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    queries: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DefinitionStore for CountingStore {
    async fn owned_address_by_signing_path(
        &self,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<OwnedAddressRow>, StoreError> {
        self.count();
        self.inner.owned_address_by_signing_path(address, signing_path).await
    }

    async fn shared_memberships_by_prefix(
        &self,
        shared_address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<MembershipRow>, StoreError> {
        self.count();
        self.inner.shared_memberships_by_prefix(shared_address, signing_path).await
    }

    async fn owned_signing_paths(
        &self,
        address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<SigningPath>, StoreError> {
        self.count();
        self.inner.owned_signing_paths(address, allowed_devices).await
    }

    async fn shared_memberships(
        &self,
        shared_address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<MembershipRow>, StoreError> {
        self.count();
        self.inner.shared_memberships(shared_address, allowed_devices).await
    }

    async fn definitions(&self, address: &str) -> Result<Vec<Value>, StoreError> {
        self.count();
        self.inner.definitions(address).await
    }

    async fn funded_totals(
        &self,
        wallet: &str,
        asset: Option<&str>,
    ) -> Result<Vec<FundedAddress>, StoreError> {
        self.count();
        self.inner.funded_totals(wallet, asset).await
    }

    async fn unfinalized_member_addresses(
        &self,
        shared_addresses: &[String],
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<String>, StoreError> {
        self.count();
        self.inner
            .unfinalized_member_addresses(shared_addresses, allowed_devices)
            .await
    }

    async fn read_asset(&self, asset: &str) -> Result<Option<AssetInfo>, StoreError> {
        self.count();
        self.inner.read_asset(asset).await
    }
}

/// A forwarding call observed by [`RecordingNetwork`]
#[derive(Debug, Clone, PartialEq)]
pub enum Forward {
    OutputMembers(usize),
    WalletMembers(Vec<String>),
    AddressMembers(Vec<String>),
}

/// Records every outbound message; can be told to fail
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    pub sent: Mutex<Vec<(String, DeviceMessage)>>,
    pub forwards: Mutex<Vec<Forward>>,
    pub fail_sends: AtomicBool,
    pub fail_forwards: AtomicBool,
}

impl RecordingNetwork {
    pub fn sent(&self) -> Vec<(String, DeviceMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn forwards(&self) -> Vec<Forward> {
        self.forwards.lock().unwrap().clone()
    }

    fn forward(&self, call: Forward) -> Result<(), NetworkError> {
        if self.fail_forwards.load(Ordering::SeqCst) {
            return Err(NetworkError::SendFailed("forwarding disabled".to_string()));
        }
        self.forwards.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl DeviceNetwork for RecordingNetwork {
    async fn send_to_device(
        &self,
        device_address: &str,
        message: DeviceMessage,
    ) -> Result<(), NetworkError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NetworkError::DeviceUnreachable(device_address.to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((device_address.to_string(), message));
        Ok(())
    }

    async fn forward_private_chains_to_output_members(
        &self,
        chains: &[PrivateChain],
    ) -> Result<(), NetworkError> {
        self.forward(Forward::OutputMembers(chains.len()))
    }

    async fn forward_private_chains_to_wallet_members(
        &self,
        _chains: &[PrivateChain],
        wallets: &[String],
    ) -> Result<(), NetworkError> {
        self.forward(Forward::WalletMembers(wallets.to_vec()))
    }

    async fn forward_private_chains_to_address_members(
        &self,
        _chains: &[PrivateChain],
        addresses: &[String],
    ) -> Result<(), NetworkError> {
        self.forward(Forward::AddressMembers(addresses.to_vec()))
    }
}

/// Signs with a deterministic string derived from the key coordinates
#[derive(Debug, Default)]
pub struct TestSigner {
    pub calls: Mutex<Vec<KeyDerivation>>,
}

#[async_trait]
impl LocalSigner for TestSigner {
    async fn sign(&self, key: &KeyDerivation, digest: &[u8]) -> Result<String, SigningError> {
        self.calls.lock().unwrap().push(key.clone());
        Ok(format!(
            "sig-{}-{}-{}",
            key.wallet,
            key.address_index,
            digest.len()
        ))
    }
}

/// What the scripted composer saw for one composition
#[derive(Debug, Clone)]
pub struct ComposeRecord {
    pub kind: ComposerKind,
    pub paying_addresses: Vec<String>,
    pub fee_paying_addresses: Vec<String>,
    pub signing_addresses: Vec<String>,
    pub outputs: Vec<crate::core::Output>,
    pub send_all: bool,
    pub signatures: Vec<(String, SigningPath, String)>,
    pub committed: bool,
}

/// Composer double: signs every path of every paying and signing address,
/// runs the pre-commit hook, then "commits"
#[derive(Debug, Default)]
pub struct ScriptedComposer {
    pub records: Mutex<Vec<ComposeRecord>>,
    pub sorted_funded: Mutex<Vec<FundedAddress>>,
    pub recipient_chains: Option<Vec<PrivateChain>>,
    pub cosigner_chains: Option<Vec<PrivateChain>>,
    pub not_enough_funds: bool,
}

impl ScriptedComposer {
    pub fn with_private_chains() -> Self {
        let chain = PrivateChain(vec![json!({"payload": "p"})]);
        Self {
            recipient_chains: Some(vec![chain.clone()]),
            cosigner_chains: Some(vec![chain]),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<ComposeRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn unsigned_unit(authors: &[String]) -> Value {
        json!({
            "version": "1.0",
            "authors": authors.iter().map(|a| json!({"address": a})).collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl Composer for ScriptedComposer {
    async fn read_sorted_funded_addresses(
        &self,
        _asset: Option<&str>,
        addresses: &[String],
        _estimated_amount: u64,
    ) -> Result<Vec<FundedAddress>, ComposeError> {
        Ok(self
            .sorted_funded
            .lock()
            .unwrap()
            .iter()
            .filter(|f| addresses.contains(&f.address))
            .cloned()
            .collect())
    }

    async fn compose_and_save(
        &self,
        kind: ComposerKind,
        params: ComposeParams,
    ) -> Result<ComposeOutcome, ComposeError> {
        if self.not_enough_funds {
            return Err(ComposeError::NotEnoughFunds(
                "not enough spendable funds".to_string(),
            ));
        }

        let mut authors = params.available_paying_addresses.clone();
        for address in params
            .available_fee_paying_addresses
            .iter()
            .chain(&params.signing_addresses)
        {
            if !authors.contains(address) {
                authors.push(address.clone());
            }
        }
        let unit = Self::unsigned_unit(&authors);

        let mut record = ComposeRecord {
            kind,
            paying_addresses: params.available_paying_addresses.clone(),
            fee_paying_addresses: params.available_fee_paying_addresses.clone(),
            signing_addresses: params.signing_addresses.clone(),
            outputs: params.outputs.clone(),
            send_all: params.send_all,
            signatures: Vec::new(),
            committed: false,
        };

        for address in &authors {
            let lengths = params.signer.signing_path_lengths(address).await?;
            for signing_path in lengths.keys() {
                let signature = params
                    .signer
                    .sign(&unit, None, address, signing_path)
                    .await?;
                record
                    .signatures
                    .push((address.clone(), signing_path.clone(), signature));
            }
        }

        if let Some(hook) = &params.pre_commit {
            if let Err(err) = hook
                .before_commit(
                    self.recipient_chains.as_deref(),
                    self.cosigner_chains.as_deref(),
                )
                .await
            {
                self.records.lock().unwrap().push(record);
                return Err(err.into());
            }
        }

        record.committed = true;
        self.records.lock().unwrap().push(record);
        Ok(ComposeOutcome {
            unit: "UNIT-1".to_string(),
            recipient_chains: self.recipient_chains.clone(),
            cosigner_chains: self.cosigner_chains.clone(),
        })
    }
}
