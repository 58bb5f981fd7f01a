//! Network parameter registry.
//!
//! Maps a chain id (or a network name) to the parameters the lottery constructor needs.
//! The registry is built once from the configuration, validated, and then only read.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    str::FromStr,
};

use alloy_core::primitives::{Address, B256, U256};

use crate::{
    config::{LottoConfig, NetworkConfig, parse_amount},
    errors::ConfigError,
};

/// Whether a chain is disposable or long-lived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ChainClass {
    Ephemeral,
    Persistent,
}

/// Resolved parameters for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainProfile {
    pub chain_id: u64,
    pub name: String,
    /// Ephemeral chains get a freshly provisioned mock coordinator on every run.
    pub is_ephemeral: bool,
    /// Entrance fee in wei.
    pub entrance_fee: U256,
    pub gas_lane: B256,
    pub callback_gas_limit: u32,
    /// Upkeep interval in seconds.
    pub interval: u64,
    pub coordinator: Option<Address>,
    pub subscription_id: Option<u64>,
    pub aliases: Vec<String>,
}

impl ChainProfile {
    /// Build a profile from its configuration entry, parsing amounts.
    pub fn from_config(name: &str, config: &NetworkConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            chain_id: config.chain_id,
            name: name.to_string(),
            is_ephemeral: config.ephemeral,
            entrance_fee: parse_amount("entrance_fee", &config.entrance_fee)?,
            gas_lane: config.gas_lane,
            callback_gas_limit: config.callback_gas_limit,
            interval: config.interval,
            coordinator: config.coordinator,
            subscription_id: config.subscription_id,
            aliases: config.aliases.clone(),
        })
    }

    pub fn class(&self) -> ChainClass {
        if self.is_ephemeral {
            ChainClass::Ephemeral
        } else {
            ChainClass::Persistent
        }
    }

    /// Check that exactly one of "ephemeral" and "coordinator + subscription configured" holds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_ephemeral {
            if self.coordinator.is_some() || self.subscription_id.is_some() {
                return Err(ConfigError::StaticInfraOnEphemeral {
                    chain_id: self.chain_id,
                    name: self.name.clone(),
                });
            }
            return Ok(());
        }

        self.static_infra().map(|_| ())
    }

    /// The statically configured coordinator and subscription of a persistent chain.
    pub fn static_infra(&self) -> Result<(Address, u64), ConfigError> {
        let coordinator = self
            .coordinator
            .ok_or_else(|| ConfigError::MissingCoordinator {
                chain_id: self.chain_id,
                name: self.name.clone(),
            })?;
        let subscription_id =
            self.subscription_id
                .ok_or_else(|| ConfigError::MissingSubscription {
                    chain_id: self.chain_id,
                    name: self.name.clone(),
                })?;
        Ok((coordinator, subscription_id))
    }
}

/// How the operator selects the target network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkSelector {
    ChainId(u64),
    Name(String),
}

impl FromStr for NetworkSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(chain_id) => Self::ChainId(chain_id),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl Display for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChainId(chain_id) => write!(f, "{chain_id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Immutable chain id -> parameters mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    profiles: BTreeMap<u64, ChainProfile>,
    /// Lowercased names and aliases to chain ids.
    names: BTreeMap<String, u64>,
}

impl NetworkRegistry {
    /// Build a registry, validating every profile.
    pub fn new(profiles: impl IntoIterator<Item = ChainProfile>) -> Result<Self, ConfigError> {
        let mut registry = Self {
            profiles: BTreeMap::new(),
            names: BTreeMap::new(),
        };

        for profile in profiles {
            profile.validate()?;

            let chain_id = profile.chain_id;
            for name in std::iter::once(&profile.name).chain(profile.aliases.iter()) {
                let key = name.to_lowercase();
                if registry.names.insert(key.clone(), chain_id).is_some() {
                    return Err(ConfigError::DuplicateName(key));
                }
            }

            if registry.profiles.insert(chain_id, profile).is_some() {
                return Err(ConfigError::DuplicateChain(chain_id));
            }
        }

        Ok(registry)
    }

    /// Build a registry from the configuration's network table.
    pub fn from_config(config: &LottoConfig) -> Result<Self, ConfigError> {
        let profiles = config
            .networks
            .iter()
            .map(|(name, network)| ChainProfile::from_config(name, network))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(profiles)
    }

    /// Look up the parameters of a chain.
    pub fn lookup(&self, chain_id: u64) -> Result<&ChainProfile, ConfigError> {
        self.profiles
            .get(&chain_id)
            .ok_or(ConfigError::UnknownChain(chain_id))
    }

    /// Look up the parameters of a chain by name or alias (case-insensitive).
    pub fn lookup_name(&self, name: &str) -> Result<&ChainProfile, ConfigError> {
        let chain_id = self
            .names
            .get(&name.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))?;
        self.lookup(*chain_id)
    }

    pub fn resolve(&self, selector: &NetworkSelector) -> Result<&ChainProfile, ConfigError> {
        match selector {
            NetworkSelector::ChainId(chain_id) => self.lookup(*chain_id),
            NetworkSelector::Name(name) => self.lookup_name(name),
        }
    }

    /// All profiles, ordered by chain id.
    pub fn profiles(&self) -> impl Iterator<Item = &ChainProfile> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;

    fn ephemeral(chain_id: u64, name: &str) -> ChainProfile {
        ChainProfile {
            chain_id,
            name: name.to_string(),
            is_ephemeral: true,
            entrance_fee: U256::from(10u64),
            gas_lane: B256::repeat_byte(0xd8),
            callback_gas_limit: 500_000,
            interval: 30,
            coordinator: None,
            subscription_id: None,
            aliases: vec![],
        }
    }

    fn persistent(chain_id: u64, name: &str) -> ChainProfile {
        ChainProfile {
            is_ephemeral: false,
            coordinator: Some(address!("6168499c0cFfCaCD319c818142124B7A15E857ab")),
            subscription_id: Some(0),
            ..ephemeral(chain_id, name)
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = NetworkRegistry::from_config(&LottoConfig::default()).unwrap();

        let hardhat = registry.lookup(31337).unwrap();
        assert_eq!(hardhat.name, "hardhat");
        assert_eq!(hardhat.class(), ChainClass::Ephemeral);
        assert_eq!(hardhat.entrance_fee, U256::from(10_000_000_000_000_000u64));
        assert_eq!(hardhat.callback_gas_limit, 500_000);
        assert_eq!(hardhat.interval, 30);

        let rinkeby = registry.lookup(4).unwrap();
        assert_eq!(rinkeby.class(), ChainClass::Persistent);
        assert_eq!(
            rinkeby.static_infra().unwrap(),
            (address!("6168499c0cFfCaCD319c818142124B7A15E857ab"), 0)
        );
    }

    #[test]
    fn test_unknown_chain() {
        let registry = NetworkRegistry::from_config(&LottoConfig::default()).unwrap();
        assert!(matches!(
            registry.lookup(1),
            Err(ConfigError::UnknownChain(1))
        ));
        assert!(matches!(
            registry.lookup_name("mainnet"),
            Err(ConfigError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_lookup_by_name_and_alias() {
        let registry = NetworkRegistry::from_config(&LottoConfig::default()).unwrap();
        assert_eq!(registry.lookup_name("localhost").unwrap().chain_id, 31337);
        assert_eq!(registry.lookup_name("Hardhat").unwrap().chain_id, 31337);
        assert_eq!(
            registry
                .resolve(&"rinkeby".parse::<NetworkSelector>().unwrap())
                .unwrap()
                .chain_id,
            4
        );
        assert_eq!(
            registry
                .resolve(&"31337".parse::<NetworkSelector>().unwrap())
                .unwrap()
                .name,
            "hardhat"
        );
    }

    #[test]
    fn test_persistent_requires_static_infra() {
        let mut profile = persistent(4, "rinkeby");
        profile.coordinator = None;
        assert!(matches!(
            NetworkRegistry::new([profile]),
            Err(ConfigError::MissingCoordinator { chain_id: 4, .. })
        ));

        let mut profile = persistent(4, "rinkeby");
        profile.subscription_id = None;
        assert!(matches!(
            NetworkRegistry::new([profile]),
            Err(ConfigError::MissingSubscription { chain_id: 4, .. })
        ));
    }

    #[test]
    fn test_ephemeral_rejects_static_infra() {
        let mut profile = ephemeral(31337, "hardhat");
        profile.subscription_id = Some(1);
        assert!(matches!(
            NetworkRegistry::new([profile]),
            Err(ConfigError::StaticInfraOnEphemeral { chain_id: 31337, .. })
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(matches!(
            NetworkRegistry::new([ephemeral(31337, "hardhat"), persistent(31337, "other")]),
            Err(ConfigError::DuplicateChain(31337))
        ));

        let mut aliased = persistent(4, "rinkeby");
        aliased.aliases = vec!["HARDHAT".to_string()];
        assert!(matches!(
            NetworkRegistry::new([ephemeral(31337, "hardhat"), aliased]),
            Err(ConfigError::DuplicateName(name)) if name == "hardhat"
        ));
    }

    #[test]
    fn test_invalid_entrance_fee() {
        let mut config = LottoConfig::default();
        config
            .networks
            .get_mut("hardhat")
            .unwrap()
            .entrance_fee = "lots".to_string();
        assert!(matches!(
            NetworkRegistry::from_config(&config),
            Err(ConfigError::InvalidAmount { field: "entrance_fee", .. })
        ));
    }
}
