//! Operator configuration for lottery deployments.
//!
//! The configuration is serializable to/from TOML. [`LottoConfig::default`] carries the
//! built-in network table, so a configuration file only needs to contain overrides.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256, U256, address, b256, utils::parse_ether};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;

/// The default name for the lotto configuration file.
pub const LOTTOCONF_FILENAME: &str = "Lotto.toml";

/// Confirmations waited for on persistent chains unless configured otherwise.
pub const DEFAULT_PERSISTENT_CONFIRMATIONS: u64 = 6;

/// Gas lane (key hash) shared by the built-in hardhat and rinkeby networks.
const RINKEBY_GAS_LANE: B256 =
    b256!("d89b2bf150e3b9e13446986e571fb9cab24b13cea0a43ea20a6049a85cc807cc");

/// Per-chain parameters as written in the configuration file.
///
/// Amounts are written in ether units (e.g. `"0.01"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The chain id.
    pub chain_id: u64,
    /// Whether the chain is a disposable local network.
    #[serde(default)]
    pub ephemeral: bool,
    /// Lottery entrance fee, in ether.
    pub entrance_fee: String,
    /// VRF key hash selecting the gas lane.
    pub gas_lane: B256,
    /// Gas limit for the VRF fulfillment callback.
    pub callback_gas_limit: u32,
    /// Upkeep interval in seconds.
    pub interval: u64,
    /// Pre-existing VRF coordinator (persistent chains only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<Address>,
    /// Pre-existing VRF subscription (persistent chains only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<u64>,
    /// Additional names the network can be selected by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Constants for the mock coordinator deployed on ephemeral chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockCoordinatorConfig {
    /// Name of the mock coordinator artifact.
    pub artifact: String,
    /// Flat fee per randomness request, in LINK (ether units).
    pub base_fee: String,
    /// LINK price per unit of gas, in base units.
    pub gas_price_link: u64,
    /// Amount credited to the freshly created subscription, in LINK (ether units).
    pub fund_amount: String,
}

impl Default for MockCoordinatorConfig {
    fn default() -> Self {
        Self {
            artifact: "VRFCoordinatorV2Mock".to_string(),
            base_fee: "0.25".to_string(),
            gas_price_link: 1_000_000_000,
            fund_amount: "1000".to_string(),
        }
    }
}

/// Block explorer verification settings.
///
/// The API key is deliberately absent: it is supplied at invocation time and its
/// presence is what enables verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Etherscan-compatible API endpoint.
    pub api_url: Url,
    /// Path to the solc standard JSON input used to compile the lottery.
    pub source_path: PathBuf,
    /// Fully qualified contract name, e.g. `contracts/Lottery.sol:Lottery`.
    pub contract_name: String,
    /// Compiler version string, e.g. `v0.8.7+commit.e28d00a7`.
    pub compiler_version: String,
    /// Number of status polls before giving up.
    pub poll_attempts: u32,
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("https://api.etherscan.io/v2/api")
                .expect("static explorer url is valid"),
            source_path: PathBuf::from("artifacts/build-info/Lottery.input.json"),
            contract_name: "contracts/Lottery.sol:Lottery".to_string(),
            compiler_version: "v0.8.7+commit.e28d00a7".to_string(),
            poll_attempts: 10,
            poll_interval_secs: 5,
        }
    }
}

/// Complete operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LottoConfig {
    /// Confirmations to wait for on persistent chains.
    pub persistent_confirmations: u64,
    /// Directory containing compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Mock coordinator constants for ephemeral chains.
    pub mock_coordinator: MockCoordinatorConfig,
    /// Block explorer settings.
    pub explorer: ExplorerConfig,
    /// Network table, keyed by network name.
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Default for LottoConfig {
    fn default() -> Self {
        Self {
            persistent_confirmations: DEFAULT_PERSISTENT_CONFIRMATIONS,
            artifacts_dir: PathBuf::from("artifacts"),
            mock_coordinator: MockCoordinatorConfig::default(),
            explorer: ExplorerConfig::default(),
            networks: default_networks(),
        }
    }
}

fn default_networks() -> BTreeMap<String, NetworkConfig> {
    let mut networks = BTreeMap::new();

    networks.insert(
        "hardhat".to_string(),
        NetworkConfig {
            chain_id: 31337,
            ephemeral: true,
            entrance_fee: "0.01".to_string(),
            gas_lane: RINKEBY_GAS_LANE,
            callback_gas_limit: 500_000,
            interval: 30,
            coordinator: None,
            subscription_id: None,
            aliases: vec!["localhost".to_string()],
        },
    );

    networks.insert(
        "rinkeby".to_string(),
        NetworkConfig {
            chain_id: 4,
            ephemeral: false,
            entrance_fee: "0.01".to_string(),
            gas_lane: RINKEBY_GAS_LANE,
            callback_gas_limit: 500_000,
            interval: 30,
            coordinator: Some(address!("6168499c0cFfCaCD319c818142124B7A15E857ab")),
            subscription_id: Some(0),
            aliases: vec![],
        },
    );

    // The subscription has to be created in the VRF UI and set in the config file.
    networks.insert(
        "sepolia".to_string(),
        NetworkConfig {
            chain_id: 11155111,
            ephemeral: false,
            entrance_fee: "0.01".to_string(),
            gas_lane: b256!("474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"),
            callback_gas_limit: 500_000,
            interval: 30,
            coordinator: Some(address!("8103B0A8A00be2DDC778e6e7eaa21791Cd364625")),
            subscription_id: Some(0),
            aliases: vec![],
        },
    );

    networks
}

impl LottoConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize lotto config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Parse an amount written in ether units into base units (18 decimals).
pub fn parse_amount(field: &'static str, value: &str) -> Result<U256, ConfigError> {
    parse_ether(value.trim()).map_err(|e| ConfigError::InvalidAmount {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an amount written in ether units into base units that must fit in a `u128`.
pub fn parse_amount_u128(field: &'static str, value: &str) -> Result<u128, ConfigError> {
    let amount = parse_amount(field, value)?;
    u128::try_from(amount).map_err(|_| ConfigError::InvalidAmount {
        field,
        value: value.to_string(),
        reason: "amount exceeds 128 bits".to_string(),
    })
}
