//! lotto is a CLI tool to deploy the VRF lottery on local and public networks.

mod cli;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::utils::format_ether;
use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use cli::{Cli, Command, ConfigArgs, DeployArgs};
use lotto_deploy::{
    ArtifactStore, ConfigError, DeploySettings, EtherscanVerifier, LOTTOCONF_FILENAME, LottoConfig,
    NetworkRegistry, Orchestrator, RpcChain, VerificationGateway,
};

/// Configuration keys that can be overridden from `LOTTO_*` environment variables.
const ENV_OVERRIDES: &[&str] = &["persistent_confirmations", "artifacts_dir"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Deploy(args) => deploy(args, config).await,
        Command::Networks => list_networks(&config),
        Command::Config(args) => show_config(args, &config),
    }
}

/// Layer the built-in defaults, the configuration file and the environment.
fn load_config(path: Option<&Path>) -> Result<LottoConfig> {
    let file = match path {
        Some(path) if path.is_dir() => Some(path.join(LOTTOCONF_FILENAME)),
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(path) => anyhow::bail!("Configuration file not found: {}", path.display()),
        None => Some(PathBuf::from(LOTTOCONF_FILENAME)).filter(|p| p.exists()),
    };

    let mut figment = Figment::from(Serialized::defaults(LottoConfig::default()));
    if let Some(file) = &file {
        tracing::debug!(path = %file.display(), "Loading configuration file...");
        figment = figment.merge(Toml::file(file));
    }

    figment
        .merge(Env::prefixed("LOTTO_").only(ENV_OVERRIDES))
        .extract()
        .context("Failed to load lotto configuration")
}

async fn deploy(args: DeployArgs, mut config: LottoConfig) -> Result<()> {
    if let Some(artifacts_dir) = args.artifacts_dir {
        config.artifacts_dir = artifacts_dir;
    }

    let registry = NetworkRegistry::from_config(&config)?;
    let settings = DeploySettings::from_config(&config)?;

    let chain = RpcChain::new(
        args.rpc_url.clone(),
        ArtifactStore::new(&config.artifacts_dir),
    )?
    .with_receipt_timeout(Duration::from_secs(args.receipt_timeout_secs));

    let remote_chain_id = chain
        .chain_id()
        .await
        .context(format!("Failed to reach RPC endpoint {}", args.rpc_url))?;

    let chain_id = match &args.network {
        Some(selector) => {
            let profile = registry.resolve(selector)?;
            if profile.chain_id != remote_chain_id {
                anyhow::bail!(
                    "Network '{}' has chain id {} but {} reports chain id {}",
                    selector,
                    profile.chain_id,
                    args.rpc_url,
                    remote_chain_id
                );
            }
            profile.chain_id
        }
        None => remote_chain_id,
    };

    let deployer = match args.deployer {
        Some(deployer) => deployer,
        None => chain
            .accounts()
            .await?
            .first()
            .copied()
            .ok_or_else(|| {
                ConfigError::NoDeployer(format!("{} exposes no accounts", args.rpc_url))
            })?,
    };

    let verifier = args
        .etherscan_api_key
        .filter(|key| !key.trim().is_empty())
        .map(|key| EtherscanVerifier::new(key, config.explorer.clone()))
        .transpose()?;

    let orchestrator = Orchestrator::new(
        registry,
        settings,
        chain,
        VerificationGateway::new(verifier),
    );

    let artifact = orchestrator.run(chain_id, deployer).await?;

    tracing::info!(
        chain_id,
        address = %artifact.address,
        confirmations = artifact.confirmations_waited,
        "Deployment complete"
    );

    Ok(())
}

fn list_networks(config: &LottoConfig) -> Result<()> {
    let registry = NetworkRegistry::from_config(config)?;

    let mut table = Table::new();
    table.set_header(vec![
        "Name",
        "Chain id",
        "Class",
        "Entrance fee (ETH)",
        "Interval (s)",
        "Coordinator",
        "Subscription",
        "Aliases",
    ]);

    for profile in registry.profiles() {
        table.add_row(vec![
            profile.name.clone(),
            profile.chain_id.to_string(),
            profile.class().to_string(),
            format_ether(profile.entrance_fee),
            profile.interval.to_string(),
            profile
                .coordinator
                .map_or_else(|| "mock".to_string(), |c| c.to_string()),
            profile
                .subscription_id
                .map_or_else(|| "fresh".to_string(), |s| s.to_string()),
            profile.aliases.join(", "),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn show_config(args: ConfigArgs, config: &LottoConfig) -> Result<()> {
    match args.output {
        Some(path) => config.save_to_file(&path),
        None => {
            let content = toml::to_string_pretty(config)
                .context("Failed to serialize lotto config to TOML")?;
            print!("{content}");
            Ok(())
        }
    }
}
