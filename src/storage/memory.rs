//! In-memory definition store
//!
//! Holds the wallet tables as plain vectors and answers the
//! [`DefinitionStore`] queries by scanning them. Used by the CLI (loaded
//! from a JSON snapshot) and by tests.

use crate::core::{AssetInfo, FundedAddress, SigningPath};
use crate::storage::store::{
    device_allowed, DefinitionStore, MembershipRow, OwnedAddressRow, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// A wallet and its approval state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub wallet: String,
    pub full_approval_date: Option<DateTime<Utc>>,
}

/// A wallet-level signing path and the device holding its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSigningPathRecord {
    pub wallet: String,
    pub signing_path: SigningPath,
    pub device_address: String,
}

/// An address derived from a wallet's keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedAddressRecord {
    pub address: String,
    pub wallet: String,
    pub account: u32,
    pub is_change: bool,
    pub address_index: u32,
    pub definition: Value,
}

/// A shared address and its definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedAddressRecord {
    pub shared_address: String,
    pub definition: Value,
}

/// A member of a shared address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub shared_address: String,
    pub signing_path: SigningPath,
    /// Empty for a hidden-commitment leaf
    pub address: String,
    pub device_address: String,
}

/// Main-chain ordering of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequence {
    Good,
    TempBad,
    FinalBad,
}

/// A ledger unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub unit: String,
    pub is_stable: bool,
    pub sequence: Sequence,
    pub level: u64,
}

/// An author of a unit, possibly carrying a definition change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub unit: String,
    pub address: String,
    pub definition_chash: Option<String>,
}

/// A payment output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub unit: String,
    pub address: String,
    /// `None` for the base asset
    pub asset: Option<String>,
    pub amount: u64,
    pub is_spent: bool,
}

/// A posted change of an address definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionChangeRecord {
    pub unit: String,
    pub address: String,
    pub definition_chash: String,
}

/// A known definition by its hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    pub definition_chash: String,
    pub definition: Value,
}

/// All tables of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub wallets: Vec<WalletRecord>,
    pub wallet_signing_paths: Vec<WalletSigningPathRecord>,
    pub my_addresses: Vec<OwnedAddressRecord>,
    pub shared_addresses: Vec<SharedAddressRecord>,
    pub shared_address_signing_paths: Vec<MembershipRecord>,
    /// Addresses that appeared on the ledger
    pub addresses: Vec<String>,
    pub units: Vec<UnitRecord>,
    pub unit_authors: Vec<AuthorRecord>,
    pub outputs: Vec<OutputRecord>,
    pub address_definition_changes: Vec<DefinitionChangeRecord>,
    pub definitions: Vec<DefinitionRecord>,
    pub assets: Vec<AssetInfo>,
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wallet; approved wallets get the current time as approval date
    pub fn add_wallet(&mut self, wallet: &str, approved: bool) -> &mut Self {
        self.wallets.push(WalletRecord {
            wallet: wallet.to_string(),
            full_approval_date: approved.then(Utc::now),
        });
        self
    }

    pub fn add_wallet_signing_path(
        &mut self,
        wallet: &str,
        signing_path: SigningPath,
        device_address: &str,
    ) -> &mut Self {
        self.wallet_signing_paths.push(WalletSigningPathRecord {
            wallet: wallet.to_string(),
            signing_path,
            device_address: device_address.to_string(),
        });
        self
    }

    pub fn add_owned_address(&mut self, record: OwnedAddressRecord) -> &mut Self {
        self.my_addresses.push(record);
        self
    }

    pub fn add_shared_address(&mut self, shared_address: &str, definition: Value) -> &mut Self {
        self.shared_addresses.push(SharedAddressRecord {
            shared_address: shared_address.to_string(),
            definition,
        });
        self
    }

    pub fn add_member(
        &mut self,
        shared_address: &str,
        signing_path: SigningPath,
        address: &str,
        device_address: &str,
    ) -> &mut Self {
        self.shared_address_signing_paths.push(MembershipRecord {
            shared_address: shared_address.to_string(),
            signing_path,
            address: address.to_string(),
            device_address: device_address.to_string(),
        });
        self
    }

    pub fn add_unit(&mut self, unit: &str, is_stable: bool, level: u64) -> &mut Self {
        self.units.push(UnitRecord {
            unit: unit.to_string(),
            is_stable,
            sequence: Sequence::Good,
            level,
        });
        self
    }

    pub fn add_output(
        &mut self,
        unit: &str,
        address: &str,
        asset: Option<&str>,
        amount: u64,
    ) -> &mut Self {
        self.outputs.push(OutputRecord {
            unit: unit.to_string(),
            address: address.to_string(),
            asset: asset.map(str::to_string),
            amount,
            is_spent: false,
        });
        self
    }

    pub fn add_asset(&mut self, asset: AssetInfo) -> &mut Self {
        self.assets.push(asset);
        self
    }

    fn unit(&self, unit: &str) -> Option<&UnitRecord> {
        self.units.iter().find(|u| u.unit == unit)
    }

    fn wallet(&self, wallet: &str) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| w.wallet == wallet)
    }

    fn owned(&self, address: &str) -> impl Iterator<Item = &OwnedAddressRecord> {
        let address = address.to_string();
        self.my_addresses.iter().filter(move |a| a.address == address)
    }

    fn is_owned(&self, address: &str) -> bool {
        self.owned(address).next().is_some()
    }

    fn is_shared(&self, address: &str) -> bool {
        self.shared_addresses
            .iter()
            .any(|s| s.shared_address == address)
    }

    /// Owned addresses joined with the signing paths of their wallet
    fn owned_with_paths<'a>(
        &'a self,
        address: &'a str,
    ) -> impl Iterator<Item = (&'a OwnedAddressRecord, &'a WalletSigningPathRecord)> + 'a {
        self.owned(address).flat_map(move |owned| {
            self.wallet_signing_paths
                .iter()
                .filter(move |p| p.wallet == owned.wallet)
                .map(move |p| (owned, p))
        })
    }

    fn has_pending_definition_change(&self, address: &str) -> bool {
        self.unit_authors.iter().any(|author| {
            author.address == address
                && author.definition_chash.is_some()
                && self.unit(&author.unit).is_some_and(|u| !u.is_stable)
        })
    }

    /// Definition of the latest stable, good definition change of an address,
    /// if that definition is known
    fn latest_stable_definition(&self, address: &str) -> Option<&Value> {
        let latest = self
            .address_definition_changes
            .iter()
            .filter(|change| change.address == address)
            .filter_map(|change| {
                self.unit(&change.unit)
                    .filter(|u| u.is_stable && u.sequence == Sequence::Good)
                    .map(|u| (u.level, change))
            })
            .max_by_key(|(level, _)| *level)?
            .1;

        self.definitions
            .iter()
            .find(|d| d.definition_chash == latest.definition_chash)
            .map(|d| &d.definition)
    }

    fn membership_row(record: &MembershipRecord) -> MembershipRow {
        MembershipRow {
            signing_path: record.signing_path.clone(),
            address: record.address.clone(),
            device_address: record.device_address.clone(),
        }
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            tables: RwLock::new(snapshot),
        }
    }

    /// Copy of the current tables
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.tables.read().await.clone()
    }

    /// Apply a change to the tables
    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut StoreSnapshot),
    {
        let mut tables = self.tables.write().await;
        change(&mut tables);
    }
}

#[async_trait]
impl DefinitionStore for MemoryStore {
    async fn owned_address_by_signing_path(
        &self,
        address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<OwnedAddressRow>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables
            .owned_with_paths(address)
            .filter(|(_, path)| &path.signing_path == signing_path)
            .filter_map(|(owned, path)| {
                tables.wallet(&owned.wallet).map(|wallet| OwnedAddressRow {
                    wallet: owned.wallet.clone(),
                    account: owned.account,
                    is_change: owned.is_change,
                    address_index: owned.address_index,
                    full_approval_date: wallet.full_approval_date,
                    device_address: path.device_address.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    async fn shared_memberships_by_prefix(
        &self,
        shared_address: &str,
        signing_path: &SigningPath,
    ) -> Result<Vec<MembershipRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .shared_address_signing_paths
            .iter()
            .filter(|m| m.shared_address == shared_address)
            .filter(|m| signing_path.starts_with(&m.signing_path))
            .map(StoreSnapshot::membership_row)
            .collect())
    }

    async fn owned_signing_paths(
        &self,
        address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<SigningPath>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .owned_with_paths(address)
            .filter(|(_, path)| device_allowed(allowed_devices, &path.device_address))
            .map(|(_, path)| path.signing_path.clone())
            .collect())
    }

    async fn shared_memberships(
        &self,
        shared_address: &str,
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<MembershipRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .shared_address_signing_paths
            .iter()
            .filter(|m| m.shared_address == shared_address)
            .filter(|m| device_allowed(allowed_devices, &m.device_address))
            .map(StoreSnapshot::membership_row)
            .collect())
    }

    async fn definitions(&self, address: &str) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let mut definitions: Vec<Value> = Vec::new();
        let candidates = tables.owned(address).map(|a| &a.definition).chain(
            tables
                .shared_addresses
                .iter()
                .filter(|s| s.shared_address == address)
                .map(|s| &s.definition),
        );
        for definition in candidates {
            if !definitions.contains(definition) {
                definitions.push(definition.clone());
            }
        }
        Ok(definitions)
    }

    async fn funded_totals(
        &self,
        wallet: &str,
        asset: Option<&str>,
    ) -> Result<Vec<FundedAddress>, StoreError> {
        let tables = self.tables.read().await;
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();

        for output in &tables.outputs {
            if output.is_spent || output.asset.as_deref() != asset {
                continue;
            }
            if !tables.owned(&output.address).any(|a| a.wallet == wallet) {
                continue;
            }
            let spendable = tables
                .unit(&output.unit)
                .is_some_and(|u| u.is_stable && u.sequence == Sequence::Good);
            if !spendable || tables.has_pending_definition_change(&output.address) {
                continue;
            }
            let total = totals.entry(output.address.as_str()).or_default();
            *total = total.checked_add(output.amount).ok_or_else(|| {
                StoreError::InvalidData(format!("balance overflow on {}", output.address))
            })?;
        }

        Ok(totals
            .into_iter()
            .map(|(address, total)| FundedAddress::new(address, total))
            .collect())
    }

    async fn unfinalized_member_addresses(
        &self,
        shared_addresses: &[String],
        allowed_devices: Option<&[String]>,
    ) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let mut seen = BTreeSet::new();
        let mut members = Vec::new();

        for membership in &tables.shared_address_signing_paths {
            if !shared_addresses.contains(&membership.shared_address) {
                continue;
            }
            if !device_allowed(allowed_devices, &membership.device_address) {
                continue;
            }
            let member = membership.address.as_str();
            if !(tables.is_owned(member) || tables.is_shared(member)) {
                continue;
            }
            let on_ledger = tables.addresses.iter().any(|a| a == member);
            let finalized = on_ledger && tables.latest_stable_definition(member).is_some();
            if !finalized && seen.insert(member) {
                members.push(member.to_string());
            }
        }
        Ok(members)
    }

    async fn read_asset(&self, asset: &str) -> Result<Option<AssetInfo>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.assets.iter().find(|a| a.asset == asset).cloned())
    }
}
