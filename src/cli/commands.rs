//! CLI commands for the wallet
//!
//! Inspection commands over a store snapshot: how paths resolve, what a
//! definition needs signed, who must cosign and which addresses can pay.

use crate::config::WalletConfig;
use crate::core::{normalize_asset, SigningPath};
use crate::selection::{read_wallet_funded_addresses, CosignerClosureResolver};
use crate::signing::{PathResolver, SigningPathEnumerator};
use crate::storage::{DefinitionStore, MemoryStore, SnapshotConfig, SnapshotStorage, StoreSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const CONFIG_FILE: &str = "config.json";

/// Application state
pub struct AppState {
    pub config: Arc<WalletConfig>,
    pub store: Arc<MemoryStore>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the configuration and the store snapshot from `data_dir`, or
    /// the snapshot from `snapshot_path` when given
    pub fn new(
        data_dir: PathBuf,
        config_path: Option<&Path>,
        snapshot_path: Option<&Path>,
        device: Option<&str>,
    ) -> CliResult<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE));
        let mut config = if config_path.exists() {
            WalletConfig::load(&config_path)?
        } else {
            WalletConfig::default()
        };
        if let Some(device) = device {
            config.device_address = device.to_string();
        }
        config.validate()?;

        let storage = match snapshot_path {
            Some(path) => SnapshotStorage::new(SnapshotConfig::for_file(path))?,
            None => SnapshotStorage::new(snapshot_config(&data_dir))?,
        };
        let snapshot = if storage.exists() {
            storage.load()?
        } else if let Some(path) = snapshot_path {
            return Err(format!("No store snapshot at {:?}", path).into());
        } else {
            log::warn!("No store snapshot in {:?}, starting empty", data_dir);
            StoreSnapshot::new()
        };

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(MemoryStore::new(snapshot)),
            data_dir,
        })
    }

    fn store(&self) -> Arc<dyn DefinitionStore> {
        self.store.clone()
    }
}

fn snapshot_config(data_dir: &Path) -> SnapshotConfig {
    SnapshotConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    }
}

/// Split a comma-separated list
pub fn parse_list(list: Option<&str>) -> Option<Vec<String>> {
    list.map(|l| {
        l.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Write a default configuration and an empty store
pub fn cmd_init(data_dir: &Path, device: &str) -> CliResult<()> {
    let storage = SnapshotStorage::new(snapshot_config(data_dir))?;
    if storage.exists() {
        println!("⚠️  Store already exists at {:?}", data_dir);
        return Ok(());
    }

    let config = WalletConfig::for_device(device);
    config.validate()?;
    config.save(&data_dir.join(CONFIG_FILE))?;
    storage.save(&StoreSnapshot::new())?;

    println!("✅ Initialized wallet store at {:?}", data_dir);
    println!("   Device: {}", device);
    Ok(())
}

/// Classify who signs `address` at `path`
pub async fn cmd_resolve(state: &AppState, address: &str, path: &str) -> CliResult<()> {
    let signing_path = SigningPath::parse(path)?;
    let resolver = PathResolver::new(state.store(), state.config.clone());
    let classification = resolver.resolve(address, &signing_path).await?;

    println!("🔑 {} at {}", address, signing_path);
    println!("   Signer: {}", classification);
    Ok(())
}

/// List the signing paths of an address
pub async fn cmd_paths(state: &AppState, address: &str, devices: Option<&str>) -> CliResult<()> {
    let devices = parse_list(devices);
    let enumerator = SigningPathEnumerator::new(state.store(), state.config.clone());
    let paths = enumerator.enumerate(address, devices.as_deref()).await?;

    println!("📜 Signing paths of {} ({})", address, paths.len());
    for (path, kind) in &paths {
        println!("   {}└─ {} ({:?})", "  ".repeat(path.depth()), path, kind);
    }
    Ok(())
}

/// Show the additional addresses that must sign
pub async fn cmd_cosigners(
    state: &AppState,
    paying: &str,
    signing: Option<&str>,
    devices: Option<&str>,
) -> CliResult<()> {
    let paying = parse_list(Some(paying)).unwrap_or_default();
    let signing = parse_list(signing).unwrap_or_default();
    let devices = parse_list(devices);

    let resolver = CosignerClosureResolver::new(state.store(), state.config.clone());
    let additional = resolver
        .closure(&paying, &signing, devices.as_deref())
        .await?;

    if additional.is_empty() {
        println!("✅ No additional signers needed");
        return Ok(());
    }
    println!("✍️  Additional signing addresses ({})", additional.len());
    for address in &additional {
        println!("   └─ {}", address);
    }
    Ok(())
}

/// Show the funded addresses of a wallet
pub async fn cmd_funded(
    state: &AppState,
    wallet: &str,
    asset: Option<&str>,
    amount: u64,
) -> CliResult<()> {
    let asset = normalize_asset(asset);
    let funded = read_wallet_funded_addresses(
        state.store.as_ref(),
        asset,
        wallet,
        amount,
        state.config.max_fee,
    )
    .await?;

    println!(
        "💰 Funded addresses of {} in {}",
        wallet,
        asset.unwrap_or("base")
    );
    if funded.is_empty() {
        println!("   (none)");
    }
    for row in &funded {
        println!("   └─ {} = {}", row.address, row.total);
    }
    Ok(())
}

/// Print the definition of an address
pub async fn cmd_definition(state: &AppState, address: &str) -> CliResult<()> {
    let definitions = state.store.definitions(address).await?;
    match definitions.as_slice() {
        [] => println!("❌ No definition recorded for {}", address),
        [definition] => println!("{}", serde_json::to_string_pretty(definition)?),
        _ => {
            return Err(format!("{} definitions recorded for {}", definitions.len(), address).into())
        }
    }
    Ok(())
}
