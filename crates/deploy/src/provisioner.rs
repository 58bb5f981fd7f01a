//! Ephemeral infrastructure provisioning.
//!
//! On a local chain there is no VRF coordinator, so every run deploys a
//! `VRFCoordinatorV2Mock`, creates a subscription on it and funds that subscription.
//! Each step depends on the previous one; any failure aborts the run.

use alloy_core::primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolEvent, SolValue};

use crate::{
    client::{ContractDeployer, CoordinatorClient, DeployRequest, TransactionReceipt},
    config::{MockCoordinatorConfig, parse_amount_u128},
    errors::{ConfigError, ProvisioningError},
    registry::ChainProfile,
    solidity::SubscriptionCreated,
};

/// The mock coordinator is deployed with a single confirmation.
const MOCK_DEPLOY_CONFIRMATIONS: u64 = 1;

/// Largest value representable as a `uint96`.
const UINT96_MAX: u128 = (1u128 << 96) - 1;

/// Mock coordinator constants with amounts resolved to base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCoordinatorSettings {
    pub artifact: String,
    /// Flat fee per request, in LINK base units.
    pub base_fee: u128,
    /// LINK base units per unit of gas.
    pub gas_price_link: u64,
    /// Amount credited to the subscription, in LINK base units.
    pub fund_amount: u128,
}

impl MockCoordinatorSettings {
    pub fn from_config(config: &MockCoordinatorConfig) -> Result<Self, ConfigError> {
        let base_fee = parse_amount_u128("mock_coordinator.base_fee", &config.base_fee)?;
        let fund_amount = parse_amount_u128("mock_coordinator.fund_amount", &config.fund_amount)?;

        for (field, value, amount) in [
            ("mock_coordinator.base_fee", &config.base_fee, base_fee),
            ("mock_coordinator.fund_amount", &config.fund_amount, fund_amount),
        ] {
            if amount > UINT96_MAX {
                return Err(ConfigError::InvalidAmount {
                    field,
                    value: value.clone(),
                    reason: "amount exceeds uint96".to_string(),
                });
            }
        }

        Ok(Self {
            artifact: config.artifact.clone(),
            base_fee,
            gas_price_link: config.gas_price_link,
            fund_amount,
        })
    }

    /// ABI-encoded `(uint96 baseFee, uint96 gasPriceLink)` constructor arguments.
    pub fn constructor_args(&self) -> Bytes {
        (U256::from(self.base_fee), U256::from(self.gas_price_link))
            .abi_encode_params()
            .into()
    }
}

impl Default for MockCoordinatorSettings {
    fn default() -> Self {
        Self {
            artifact: "VRFCoordinatorV2Mock".to_string(),
            base_fee: 250_000_000_000_000_000,
            gas_price_link: 1_000_000_000,
            fund_amount: 1_000_000_000_000_000_000_000,
        }
    }
}

/// Coordinator and subscription created for a single run.
///
/// Never persisted and never reused by a later run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedInfra {
    pub coordinator: Address,
    pub subscription_id: u64,
    pub funded_amount: u128,
}

/// Provisions a funded mock coordinator on an ephemeral chain.
pub struct EphemeralProvisioner<'a, C> {
    client: &'a C,
    settings: &'a MockCoordinatorSettings,
}

impl<'a, C> EphemeralProvisioner<'a, C>
where
    C: ContractDeployer + CoordinatorClient,
{
    pub fn new(client: &'a C, settings: &'a MockCoordinatorSettings) -> Self {
        Self { client, settings }
    }

    /// Deploy the mock, create a subscription and fund it, in that order.
    ///
    /// # Panics
    ///
    /// If `profile` is not ephemeral. The mock path must never run against a real chain.
    pub async fn provision(
        &self,
        profile: &ChainProfile,
        from: Address,
    ) -> Result<ProvisionedInfra, ProvisioningError> {
        assert!(
            profile.is_ephemeral,
            "mock coordinator provisioning invoked on persistent chain {}",
            profile.chain_id
        );

        tracing::info!(
            chain_id = profile.chain_id,
            artifact = %self.settings.artifact,
            base_fee = self.settings.base_fee,
            gas_price_link = self.settings.gas_price_link,
            "Local network detected, deploying mock coordinator..."
        );

        let mock = self
            .client
            .deploy(DeployRequest {
                artifact: self.settings.artifact.clone(),
                constructor_args: self.settings.constructor_args(),
                from,
                confirmations: MOCK_DEPLOY_CONFIRMATIONS,
            })
            .await
            .map_err(ProvisioningError::MockDeployment)?;
        let coordinator = mock.address;

        tracing::info!(%coordinator, "Mock coordinator deployed");

        let receipt = self
            .client
            .create_subscription(coordinator, from)
            .await
            .map_err(|source| ProvisioningError::SubscriptionCreation {
                coordinator,
                source,
            })?;
        let subscription_id = subscription_id_from_receipt(&receipt)?;

        tracing::info!(%coordinator, subscription_id, "Subscription created");

        self.client
            .fund_subscription(coordinator, subscription_id, self.settings.fund_amount, from)
            .await
            .map_err(|source| ProvisioningError::Funding {
                subscription_id,
                source,
            })?;

        tracing::info!(
            subscription_id,
            amount = self.settings.fund_amount,
            "Subscription funded"
        );

        Ok(ProvisionedInfra {
            coordinator,
            subscription_id,
            funded_amount: self.settings.fund_amount,
        })
    }
}

/// Extract the subscription id from a `createSubscription` receipt.
///
/// The mock does not return the id; it is the first indexed field of the first log,
/// which must be a `SubscriptionCreated` event.
pub fn subscription_id_from_receipt(
    receipt: &TransactionReceipt,
) -> Result<u64, ProvisioningError> {
    let tx_hash = receipt.transaction_hash;
    let malformed = |reason: &str| ProvisioningError::MalformedSubscriptionEvent {
        tx_hash,
        reason: reason.to_string(),
    };

    let log = receipt
        .logs
        .first()
        .ok_or(ProvisioningError::MissingSubscriptionEvent { tx_hash })?;

    match log.topics.first() {
        Some(signature) if *signature == SubscriptionCreated::SIGNATURE_HASH => {}
        Some(_) => return Err(malformed("first event is not SubscriptionCreated")),
        None => return Err(malformed("event has no topics")),
    }

    let topic = log
        .topics
        .get(1)
        .ok_or_else(|| malformed("missing indexed subscription id"))?;

    // uint64 left-padded to 32 bytes
    let (padding, id) = topic.as_slice().split_at(24);
    if padding.iter().any(|b| *b != 0) {
        return Err(malformed("subscription id does not fit in uint64"));
    }

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(id);
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{B256, address};

    use super::*;
    use crate::{client::Log, config::MockCoordinatorConfig};

    fn receipt_with_logs(logs: Vec<Log>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: B256::repeat_byte(0x11),
            block_number: 2,
            status: Some(1),
            contract_address: None,
            logs,
        }
    }

    fn subscription_log(topics: Vec<B256>) -> Log {
        Log {
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            topics,
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_subscription_id_from_first_event() {
        let receipt = receipt_with_logs(vec![subscription_log(vec![
            SubscriptionCreated::SIGNATURE_HASH,
            B256::from(U256::from(1u64)),
        ])]);
        assert_eq!(subscription_id_from_receipt(&receipt).unwrap(), 1);

        let receipt = receipt_with_logs(vec![subscription_log(vec![
            SubscriptionCreated::SIGNATURE_HASH,
            B256::from(U256::from(u64::MAX)),
        ])]);
        assert_eq!(subscription_id_from_receipt(&receipt).unwrap(), u64::MAX);
    }

    #[test]
    fn test_subscription_event_missing() {
        let receipt = receipt_with_logs(vec![]);
        assert!(matches!(
            subscription_id_from_receipt(&receipt),
            Err(ProvisioningError::MissingSubscriptionEvent { .. })
        ));
    }

    #[test]
    fn test_subscription_event_malformed() {
        let wrong_signature = receipt_with_logs(vec![subscription_log(vec![
            B256::repeat_byte(0xaa),
            B256::from(U256::from(1u64)),
        ])]);
        assert!(matches!(
            subscription_id_from_receipt(&wrong_signature),
            Err(ProvisioningError::MalformedSubscriptionEvent { .. })
        ));

        let missing_topic =
            receipt_with_logs(vec![subscription_log(vec![SubscriptionCreated::SIGNATURE_HASH])]);
        assert!(matches!(
            subscription_id_from_receipt(&missing_topic),
            Err(ProvisioningError::MalformedSubscriptionEvent { .. })
        ));

        let too_large = receipt_with_logs(vec![subscription_log(vec![
            SubscriptionCreated::SIGNATURE_HASH,
            B256::from(U256::from(u64::MAX) + U256::from(1u64)),
        ])]);
        assert!(matches!(
            subscription_id_from_receipt(&too_large),
            Err(ProvisioningError::MalformedSubscriptionEvent { .. })
        ));
    }

    #[test]
    fn test_only_first_event_is_read() {
        let receipt = receipt_with_logs(vec![
            subscription_log(vec![B256::repeat_byte(0xaa)]),
            subscription_log(vec![
                SubscriptionCreated::SIGNATURE_HASH,
                B256::from(U256::from(7u64)),
            ]),
        ]);
        assert!(subscription_id_from_receipt(&receipt).is_err());
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings =
            MockCoordinatorSettings::from_config(&MockCoordinatorConfig::default()).unwrap();
        assert_eq!(settings, MockCoordinatorSettings::default());
    }

    #[test]
    fn test_settings_reject_uint96_overflow() {
        let config = MockCoordinatorConfig {
            fund_amount: "100000000000".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            MockCoordinatorSettings::from_config(&config),
            Err(ConfigError::InvalidAmount {
                field: "mock_coordinator.fund_amount",
                ..
            })
        ));
    }

    #[test]
    fn test_mock_constructor_args() {
        let args = MockCoordinatorSettings::default().constructor_args();
        assert_eq!(args.len(), 64);
        assert_eq!(
            U256::from_be_slice(&args[..32]),
            U256::from(250_000_000_000_000_000u128)
        );
        assert_eq!(U256::from_be_slice(&args[32..]), U256::from(1_000_000_000u64));
    }
}
