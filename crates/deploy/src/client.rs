//! Collaborator interfaces used by the deployment pipeline.
//!
//! The pipeline never talks to a chain or a block explorer directly. It goes through
//! these traits, which are implemented over JSON-RPC in [`crate::rpc`] and over the
//! Etherscan API in [`crate::etherscan`], and by in-memory fakes in tests.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

use crate::verify::VerificationStatus;

/// A request to deploy a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Name of the compiled artifact, e.g. `Lottery`.
    pub artifact: String,
    /// ABI-encoded constructor arguments, appended to the creation bytecode.
    pub constructor_args: Bytes,
    /// Account sending the creation transaction.
    pub from: Address,
    /// Number of confirmations to wait for before returning.
    pub confirmations: u64,
}

/// A contract created by a [`ContractDeployer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// An event emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// The subset of a transaction receipt the pipeline relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    /// `Some(1)` on success, `Some(0)` on revert, `None` for pre-Byzantium receipts.
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    pub status: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Whether the transaction reverted.
    pub fn reverted(&self) -> bool {
        self.status == Some(0)
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
pub(crate) fn deserialize_u64_from_hex<'de, D>(
    deserializer: D,
) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

fn deserialize_opt_u64_from_hex<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    s.map(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16))
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Deploys compiled contracts and waits for the requested confirmation depth.
///
/// Implementations may retry transient transport errors; callers do not.
pub trait ContractDeployer: Send + Sync {
    fn deploy(
        &self,
        request: DeployRequest,
    ) -> impl Future<Output = Result<DeployedContract>> + Send;
}

/// Calls on a VRF v2 coordinator.
///
/// Both calls wait for one confirmation and return the transaction receipt.
pub trait CoordinatorClient: Send + Sync {
    /// Send `createSubscription()` to `coordinator`.
    fn create_subscription(
        &self,
        coordinator: Address,
        from: Address,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;

    /// Send `fundSubscription(subscription_id, amount)` to `coordinator`.
    fn fund_subscription(
        &self,
        coordinator: Address,
        subscription_id: u64,
        amount: u128,
        from: Address,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;
}

/// Submits deployed contracts for source verification.
pub trait SourceVerifier: Send + Sync {
    fn verify(
        &self,
        chain_id: u64,
        address: Address,
        constructor_args: &Bytes,
    ) -> impl Future<Output = Result<VerificationStatus>> + Send;
}
