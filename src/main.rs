//! DAG wallet CLI application
//!
//! Inspects how payments from a wallet store would be authorized.

use clap::{Parser, Subcommand};
use dag_wallet::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dag-wallet")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Authorization core of a DAG-ledger wallet", long_about = None)]
struct Cli {
    /// Data directory holding the config and the store snapshot
    #[arg(short, long, default_value = ".wallet_data")]
    data_dir: PathBuf,

    /// Configuration file (defaults to <data-dir>/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store snapshot file (defaults to <data-dir>/store.json)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Override the local device address
    #[arg(long)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config and an empty store
    Init {
        /// Address of this device
        #[arg(long)]
        device_address: String,
    },

    /// Classify the signer of an address at a signing path
    Resolve {
        #[arg(short, long)]
        address: String,

        /// Signing path, e.g. r.1.0
        #[arg(short, long, default_value = "r")]
        path: String,
    },

    /// List the signing paths an address definition requires
    Paths {
        #[arg(short, long)]
        address: String,

        /// Only paths held by these devices (comma-separated)
        #[arg(long)]
        devices: Option<String>,
    },

    /// Show addresses that must cosign a payment
    Cosigners {
        /// Paying addresses (comma-separated)
        #[arg(short, long)]
        paying: String,

        /// Explicit signing addresses (comma-separated)
        #[arg(short, long)]
        signing: Option<String>,

        /// Only members held by these devices (comma-separated)
        #[arg(long)]
        devices: Option<String>,
    },

    /// Show the funded addresses of a wallet
    Funded {
        #[arg(short, long)]
        wallet: String,

        /// Asset; the base asset when omitted
        #[arg(long)]
        asset: Option<String>,

        /// Target amount (0 when unknown)
        #[arg(long, default_value = "0")]
        amount: u64,
    },

    /// Print the definition of an address
    Definition {
        #[arg(short, long)]
        address: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Commands::Init { device_address } = &cli.command {
        return cli::cmd_init(&cli.data_dir, device_address);
    }

    let state = AppState::new(
        cli.data_dir.clone(),
        cli.config.as_deref(),
        cli.snapshot.as_deref(),
        cli.device.as_deref(),
    )?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match cli.command {
            Commands::Init { .. } => Ok(()),
            Commands::Resolve { address, path } => cli::cmd_resolve(&state, &address, &path).await,
            Commands::Paths { address, devices } => {
                cli::cmd_paths(&state, &address, devices.as_deref()).await
            }
            Commands::Cosigners {
                paying,
                signing,
                devices,
            } => cli::cmd_cosigners(&state, &paying, signing.as_deref(), devices.as_deref()).await,
            Commands::Funded {
                wallet,
                asset,
                amount,
            } => cli::cmd_funded(&state, &wallet, asset.as_deref(), amount).await,
            Commands::Definition { address } => cli::cmd_definition(&state, &address).await,
        }
    })
}
