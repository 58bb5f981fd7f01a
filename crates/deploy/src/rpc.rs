//! JSON-RPC chain client.
//!
//! [`RpcChain`] sends transactions through `eth_sendTransaction`, so the endpoint holds
//! the deployer's key (a local dev node, or a signing proxy in front of a real network).

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes, aliases::U96};
use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    client::{
        ContractDeployer, CoordinatorClient, DeployRequest, DeployedContract, TransactionReceipt,
    },
    solidity::{createSubscriptionCall, fundSubscriptionCall},
};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between polling attempts.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default time to wait for a receipt and its confirmations.
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 600;

/// Coordinator calls wait for a single confirmation.
const COORDINATOR_CALL_CONFIRMATIONS: u64 = 1;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error in {}: {}",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// `Ok(None)` and errors both mean "not yet"; errors are logged at trace level.
///
/// # Arguments
/// * `name` - What is being waited for (for error messages)
/// * `timeout` - Maximum time to wait
/// * `interval` - Time between attempts
/// * `check_fn` - Function that returns `Ok(Some(_))` once the condition holds
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                tracing::trace!(
                    error = %e,
                    target_name = %name,
                    "Poll attempt failed, retrying..."
                );
            }
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Timeout waiting for {}", name);
        }

        tokio::time::sleep(interval).await;
    }
}

/// Parse a `0x`-prefixed hex quantity.
fn parse_quantity(value: &str) -> Result<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity '{}'", value))
}

/// Block at which a transaction mined in `block_number` has `confirmations` confirmations.
///
/// The inclusion block is the first confirmation. Saturates instead of overflowing.
fn confirmation_target(block_number: u64, confirmations: u64) -> u64 {
    block_number.saturating_add(confirmations.saturating_sub(1))
}

/// A chain reached over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcChain {
    client: reqwest::Client,
    url: Url,
    artifacts: ArtifactStore,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChain {
    pub fn new(url: Url, artifacts: ArtifactStore) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
            artifacts,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set the time to wait for a receipt and its confirmations.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Query `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64> {
        let result: String = json_rpc_call(&self.client, &self.url, "eth_chainId", vec![])
            .await
            .context("Failed to query chain id")?;
        parse_quantity(&result)
    }

    /// Query `eth_accounts`.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        json_rpc_call(&self.client, &self.url, "eth_accounts", vec![])
            .await
            .context("Failed to list accounts")
    }

    /// Query `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64> {
        let result: String = json_rpc_call(&self.client, &self.url, "eth_blockNumber", vec![])
            .await
            .context("Failed to query block number")?;
        parse_quantity(&result)
    }

    /// Send a transaction signed by the endpoint. A missing `to` creates a contract.
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> Result<B256> {
        let mut tx = serde_json::json!({
            "from": from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        json_rpc_call(&self.client, &self.url, "eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")
    }

    /// Wait until `tx_hash` is mined and buried under `confirmations` blocks.
    ///
    /// The inclusion block counts as the first confirmation. Reverted transactions are
    /// reported as errors.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let receipt = poll_until(
            &format!("receipt of {tx_hash}"),
            self.receipt_timeout,
            self.poll_interval,
            move || async move {
                json_rpc_call::<Option<TransactionReceipt>>(
                    &self.client,
                    &self.url,
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await
            },
        )
        .await?;

        if receipt.reverted() {
            anyhow::bail!(
                "Transaction {} reverted in block {}",
                tx_hash,
                receipt.block_number
            );
        }

        if confirmations > 1 {
            let target = confirmation_target(receipt.block_number, confirmations);
            tracing::debug!(
                %tx_hash,
                confirmations,
                target_block = target,
                "Waiting for confirmations..."
            );

            poll_until(
                &format!("{confirmations} confirmations of {tx_hash}"),
                self.receipt_timeout,
                self.poll_interval,
                move || async move {
                    Ok::<_, anyhow::Error>((self.block_number().await? >= target).then_some(()))
                },
            )
            .await?;
        }

        Ok(receipt)
    }

    /// Send a transaction and wait for its receipt.
    pub async fn transact(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let tx_hash = self.send_transaction(from, to, data).await?;
        tracing::debug!(%tx_hash, %from, "Transaction sent");
        self.wait_for_receipt(tx_hash, confirmations).await
    }
}

impl ContractDeployer for RpcChain {
    async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract> {
        let bytecode = self.artifacts.bytecode(&request.artifact)?;
        let data: Bytes = [bytecode.as_ref(), request.constructor_args.as_ref()]
            .concat()
            .into();

        let receipt = self
            .transact(request.from, None, data, request.confirmations)
            .await
            .with_context(|| format!("Failed to deploy {}", request.artifact))?;

        let address = receipt.contract_address.with_context(|| {
            format!(
                "Receipt {} of {} has no contract address",
                receipt.transaction_hash, request.artifact
            )
        })?;

        Ok(DeployedContract {
            address,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}

impl CoordinatorClient for RpcChain {
    async fn create_subscription(
        &self,
        coordinator: Address,
        from: Address,
    ) -> Result<TransactionReceipt> {
        let data = createSubscriptionCall {}.abi_encode();
        self.transact(from, Some(coordinator), data.into(), COORDINATOR_CALL_CONFIRMATIONS)
            .await
    }

    async fn fund_subscription(
        &self,
        coordinator: Address,
        subscription_id: u64,
        amount: u128,
        from: Address,
    ) -> Result<TransactionReceipt> {
        let amount = U96::try_from(amount)
            .map_err(|_| anyhow::anyhow!("Funding amount {} exceeds uint96", amount))?;
        let data = fundSubscriptionCall {
            subId: subscription_id,
            amount,
        }
        .abi_encode();
        self.transact(from, Some(coordinator), data.into(), COORDINATOR_CALL_CONFIRMATIONS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x7a69").unwrap(), 31337);
        assert_eq!(parse_quantity("0x4").unwrap(), 4);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_confirmation_target() {
        assert_eq!(confirmation_target(100, 1), 100);
        assert_eq!(confirmation_target(100, 6), 105);
        assert_eq!(confirmation_target(100, 0), 100);
        assert_eq!(confirmation_target(100, u64::MAX), u64::MAX);
        assert_eq!(confirmation_target(u64::MAX - 2, 6), u64::MAX);
    }

    #[tokio::test]
    async fn test_poll_until_retries() {
        let attempts = &AtomicU32::new(0);
        let value = poll_until(
            "counter",
            Duration::from_secs(5),
            Duration::from_millis(1),
            move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                match n {
                    0 => anyhow::bail!("transient"),
                    1 => Ok(None),
                    _ => Ok(Some(n)),
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_timeout() {
        let result: Result<()> = poll_until(
            "never",
            Duration::from_millis(5),
            Duration::from_millis(1),
            || async { Ok::<_, anyhow::Error>(None) },
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("Timeout waiting for never"));
    }

    #[test]
    fn test_coordinator_calldata() {
        let create = createSubscriptionCall {}.abi_encode();
        assert_eq!(create, createSubscriptionCall::SELECTOR.to_vec());

        let fund = fundSubscriptionCall {
            subId: 1,
            amount: U96::from(1_000_000_000_000_000_000_000u128),
        }
        .abi_encode();
        assert_eq!(&fund[..4], fundSubscriptionCall::SELECTOR.as_slice());
        assert_eq!(fund.len(), 4 + 2 * 32);
        assert_eq!(fund[4 + 31], 1);
    }
}
