use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use lotto_deploy::{NetworkSelector, rpc::DEFAULT_RECEIPT_TIMEOUT_SECS};
use tracing::level_filters::LevelFilter;
use url::Url;

/// The default RPC endpoint (a local hardhat or anvil node).
const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Parser)]
#[command(name = "lotto")]
#[command(author, version, about = "Deploy the VRF lottery contract")]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "LOTTO_VERBOSITY", default_value_t = LevelFilter::INFO, global = true)]
    pub verbosity: LevelFilter,

    /// Path to a Lotto.toml configuration file (or a directory containing one).
    ///
    /// If not provided, ./Lotto.toml is used when it exists. Values in the file override
    /// the built-in network table.
    #[arg(short, long, env = "LOTTO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the lottery on the network behind an RPC endpoint.
    Deploy(DeployArgs),
    /// List the registered networks.
    Networks,
    /// Print the resolved configuration as TOML.
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct DeployArgs {
    /// The URL of the RPC endpoint. It must be able to sign for the deployer account.
    #[arg(long, alias = "rpc", env = "LOTTO_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: Url,

    /// The target network (chain id or name).
    ///
    /// If not provided, the chain id reported by the RPC endpoint is used.
    #[arg(short, long, env = "LOTTO_NETWORK")]
    pub network: Option<NetworkSelector>,

    /// The deployer account.
    ///
    /// If not provided, the first account of the RPC endpoint is used.
    #[arg(short, long, env = "LOTTO_DEPLOYER")]
    pub deployer: Option<Address>,

    /// Etherscan API key. Verification on public networks is enabled only when set.
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Directory containing compiled contract artifacts. Overrides the configuration.
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Maximum time to wait for a transaction receipt and its confirmations, in seconds.
    #[arg(long, default_value_t = DEFAULT_RECEIPT_TIMEOUT_SECS)]
    pub receipt_timeout_secs: u64,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration to this file instead of printing it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
