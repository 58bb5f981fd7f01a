//! Error taxonomy for a deployment run.
//!
//! Configuration and provisioning errors are typed so that callers (and tests) can
//! tell the failure classes apart. Errors raised by external collaborators are kept
//! as `anyhow::Error` sources and propagated unchanged.

use thiserror::Error;

/// Errors in the operator configuration or the network registry.
///
/// These are always raised before any external call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No network is registered for the chain id.
    #[error("unknown chain id {0}: no network parameters are registered for it")]
    UnknownChain(u64),

    /// No network is registered under the name or alias.
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    /// A persistent network has no coordinator address.
    #[error("network '{name}' (chain id {chain_id}) is persistent but has no coordinator address")]
    MissingCoordinator { chain_id: u64, name: String },

    /// A persistent network has no subscription id.
    #[error("network '{name}' (chain id {chain_id}) is persistent but has no subscription id")]
    MissingSubscription { chain_id: u64, name: String },

    /// An ephemeral network declares a static coordinator or subscription.
    #[error("ephemeral network '{name}' (chain id {chain_id}) declares static VRF infra")]
    StaticInfraOnEphemeral { chain_id: u64, name: String },

    /// Two networks share a chain id.
    #[error("chain id {0} is registered more than once")]
    DuplicateChain(u64),

    /// Two networks share a name or alias.
    #[error("network name '{0}' is registered more than once")]
    DuplicateName(String),

    /// An amount in the configuration could not be parsed.
    #[error("invalid amount '{value}' for {field}: {reason}")]
    InvalidAmount {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The deployer identity could not be resolved.
    #[error("no deployer account available: {0}")]
    NoDeployer(String),
}

/// Errors while provisioning the mock coordinator on an ephemeral chain.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Deploying the mock coordinator failed.
    #[error("failed to deploy the mock coordinator")]
    MockDeployment(#[source] anyhow::Error),

    /// The `createSubscription` transaction failed.
    #[error("failed to create a subscription on {coordinator}")]
    SubscriptionCreation {
        coordinator: alloy_core::primitives::Address,
        #[source]
        source: anyhow::Error,
    },

    /// The `createSubscription` receipt carried no logs.
    #[error("createSubscription receipt {tx_hash} contains no events")]
    MissingSubscriptionEvent {
        tx_hash: alloy_core::primitives::B256,
    },

    /// The first log of the `createSubscription` receipt is not a usable subscription event.
    #[error("createSubscription receipt {tx_hash} has a malformed subscription event: {reason}")]
    MalformedSubscriptionEvent {
        tx_hash: alloy_core::primitives::B256,
        reason: String,
    },

    /// The `fundSubscription` transaction failed.
    #[error("failed to fund subscription {subscription_id}")]
    Funding {
        subscription_id: u64,
        #[source]
        source: anyhow::Error,
    },
}

/// Fatal errors of a deployment run.
///
/// Verification failures never appear here: they are logged and reported through
/// [`crate::VerificationStatus`] instead.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The configuration is invalid for the requested network.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The ephemeral infrastructure could not be provisioned.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// The contract deployer failed.
    #[error("failed to deploy {artifact}")]
    Deployment {
        artifact: String,
        #[source]
        source: anyhow::Error,
    },
}
