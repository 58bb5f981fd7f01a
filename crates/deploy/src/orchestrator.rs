//! Deployment orchestration.
//!
//! A run resolves the chain profile, obtains a coordinator and subscription (provisioned
//! on ephemeral chains, static on persistent ones), assembles the constructor arguments,
//! deploys the lottery and hands the result to the verification gateway.

use std::fmt::{self, Display};

use alloy_core::primitives::{Address, B256, Bytes, U256, utils::format_ether};
use alloy_sol_types::SolValue;

use crate::{
    client::{ContractDeployer, CoordinatorClient, DeployRequest, SourceVerifier},
    config::LottoConfig,
    errors::{ConfigError, DeployError},
    provisioner::{EphemeralProvisioner, MockCoordinatorSettings},
    registry::{ChainProfile, NetworkRegistry},
    verify::VerificationGateway,
};

/// Name of the lottery artifact.
pub const LOTTERY_ARTIFACT: &str = "Lottery";

/// Confirmations waited for on ephemeral chains.
pub const EPHEMERAL_CONFIRMATIONS: u64 = 1;

/// Constructor arguments of the lottery contract.
///
/// The encoding order is part of the constructor ABI:
/// `(address vrfCoordinatorV2, uint256 entranceFee, bytes32 gasLane, uint64 subscriptionId,
/// uint32 callbackGasLimit, uint256 interval)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentArgs {
    pub coordinator: Address,
    pub entrance_fee: U256,
    pub gas_lane: B256,
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub interval: u64,
}

impl DeploymentArgs {
    /// Merge a profile with the coordinator and subscription to use.
    pub fn assemble(profile: &ChainProfile, coordinator: Address, subscription_id: u64) -> Self {
        Self {
            coordinator,
            entrance_fee: profile.entrance_fee,
            gas_lane: profile.gas_lane,
            subscription_id,
            callback_gas_limit: profile.callback_gas_limit,
            interval: profile.interval,
        }
    }

    /// The arguments as a tuple, in constructor order.
    pub fn as_tuple(&self) -> (Address, U256, B256, u64, u32, U256) {
        (
            self.coordinator,
            self.entrance_fee,
            self.gas_lane,
            self.subscription_id,
            self.callback_gas_limit,
            U256::from(self.interval),
        )
    }

    pub fn abi_encode(&self) -> Bytes {
        self.as_tuple().abi_encode_params().into()
    }
}

impl Display for DeploymentArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {} ether, {}, {}, {}, {}]",
            self.coordinator,
            format_ether(self.entrance_fee),
            self.gas_lane,
            self.subscription_id,
            self.callback_gas_limit,
            self.interval
        )
    }
}

/// The deployed lottery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedArtifact {
    pub address: Address,
    pub confirmations_waited: u64,
}

/// Run-independent settings resolved from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    /// Confirmations waited for on persistent chains.
    pub persistent_confirmations: u64,
    pub mock_coordinator: MockCoordinatorSettings,
}

impl DeploySettings {
    pub fn from_config(config: &LottoConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            persistent_confirmations: config.persistent_confirmations,
            mock_coordinator: MockCoordinatorSettings::from_config(&config.mock_coordinator)?,
        })
    }

    /// Confirmation depth for a chain.
    pub fn confirmations_for(&self, profile: &ChainProfile) -> u64 {
        if profile.is_ephemeral {
            EPHEMERAL_CONFIRMATIONS
        } else {
            self.persistent_confirmations
        }
    }
}

/// Deploys the lottery on one chain per run.
///
/// Holds no state between runs: every call to [`Orchestrator::run`] deploys a new
/// instance, and on ephemeral chains provisions a new coordinator and subscription.
pub struct Orchestrator<C, V> {
    registry: NetworkRegistry,
    settings: DeploySettings,
    client: C,
    gateway: VerificationGateway<V>,
}

impl<C, V> Orchestrator<C, V>
where
    C: ContractDeployer + CoordinatorClient,
    V: SourceVerifier,
{
    pub fn new(
        registry: NetworkRegistry,
        settings: DeploySettings,
        client: C,
        gateway: VerificationGateway<V>,
    ) -> Self {
        Self {
            registry,
            settings,
            client,
            gateway,
        }
    }

    /// Deploy the lottery on `chain_id` from `deployer`.
    ///
    /// Configuration, provisioning and deployment failures abort the run. Verification
    /// is best-effort and never fails it.
    pub async fn run(
        &self,
        chain_id: u64,
        deployer: Address,
    ) -> Result<DeployedArtifact, DeployError> {
        let profile = self.registry.lookup(chain_id)?;

        tracing::info!(
            chain_id,
            network = %profile.name,
            class = %profile.class(),
            %deployer,
            verification = self.gateway.is_enabled(),
            "Starting lottery deployment..."
        );

        let (coordinator, subscription_id) = if profile.is_ephemeral {
            let infra = EphemeralProvisioner::new(&self.client, &self.settings.mock_coordinator)
                .provision(profile, deployer)
                .await?;
            (infra.coordinator, infra.subscription_id)
        } else {
            profile.static_infra()?
        };

        let args = DeploymentArgs::assemble(profile, coordinator, subscription_id);
        let confirmations = self.settings.confirmations_for(profile);

        tracing::info!(
            artifact = LOTTERY_ARTIFACT,
            %args,
            confirmations,
            "Deploying lottery..."
        );

        let deployed = self
            .client
            .deploy(DeployRequest {
                artifact: LOTTERY_ARTIFACT.to_string(),
                constructor_args: args.abi_encode(),
                from: deployer,
                confirmations,
            })
            .await
            .map_err(|source| DeployError::Deployment {
                artifact: LOTTERY_ARTIFACT.to_string(),
                source,
            })?;

        let artifact = DeployedArtifact {
            address: deployed.address,
            confirmations_waited: confirmations,
        };

        tracing::info!(
            address = %artifact.address,
            tx_hash = %deployed.transaction_hash,
            block_number = deployed.block_number,
            confirmations,
            "Lottery deployed"
        );

        let status = self.gateway.verify(&artifact, &args, profile).await;
        tracing::info!(%status, "Verification finished");

        Ok(artifact)
    }
}
