//! lotto-deploy - Deployment library for the VRF lottery contract.
//!
//! This crate deploys the lottery on local development chains and on public networks.
//! On local chains it first provisions a mock VRF coordinator and a funded subscription;
//! on public networks it uses the registered coordinator and subscription, waits for
//! extra confirmations and submits the source for verification.

pub mod artifacts;
pub mod client;
pub mod config;
pub mod errors;
pub mod etherscan;
pub mod orchestrator;
pub mod provisioner;
pub mod registry;
pub mod rpc;
mod solidity;
pub mod verify;

pub use artifacts::ArtifactStore;
pub use client::{
    ContractDeployer, CoordinatorClient, DeployRequest, DeployedContract, Log, SourceVerifier,
    TransactionReceipt,
};
pub use config::{
    DEFAULT_PERSISTENT_CONFIRMATIONS, ExplorerConfig, LOTTOCONF_FILENAME, LottoConfig,
    MockCoordinatorConfig, NetworkConfig,
};
pub use errors::{ConfigError, DeployError, ProvisioningError};
pub use etherscan::EtherscanVerifier;
pub use orchestrator::{
    DeploySettings, DeployedArtifact, DeploymentArgs, EPHEMERAL_CONFIRMATIONS, LOTTERY_ARTIFACT,
    Orchestrator,
};
pub use provisioner::{
    EphemeralProvisioner, MockCoordinatorSettings, ProvisionedInfra, subscription_id_from_receipt,
};
pub use registry::{ChainClass, ChainProfile, NetworkRegistry, NetworkSelector};
pub use rpc::RpcChain;
pub use solidity::SubscriptionCreated;
pub use verify::{SkipReason, VerificationGateway, VerificationStatus};
