//! Etherscan source verification.
//!
//! Submits the solc standard JSON input together with the ABI-encoded constructor
//! arguments, then polls the verification status until the explorer settles.

use std::time::Duration;

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{client::SourceVerifier, config::ExplorerConfig, rpc, verify::VerificationStatus};

/// The `{status, message, result}` envelope of the Etherscan API.
#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

impl ApiResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// How the explorer answered a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Submission {
    /// Accepted, carrying the request guid.
    Accepted(String),
    Settled(VerificationStatus),
}

fn is_already_verified(text: &str) -> bool {
    text.to_lowercase().contains("already verified")
}

fn classify_submission(response: &ApiResponse) -> Submission {
    if response.is_ok() {
        return Submission::Accepted(response.result.clone());
    }
    if is_already_verified(&response.result) {
        return Submission::Settled(VerificationStatus::AlreadyVerified);
    }
    Submission::Settled(VerificationStatus::Failed(format!(
        "{}: {}",
        response.message, response.result
    )))
}

/// `None` while the request is still queued.
fn classify_status(response: &ApiResponse) -> Option<VerificationStatus> {
    let result = response.result.as_str();
    if result.contains("Pending in queue") {
        return None;
    }
    if is_already_verified(result) {
        return Some(VerificationStatus::AlreadyVerified);
    }
    if response.is_ok() || result.starts_with("Pass") {
        return Some(VerificationStatus::Verified);
    }
    Some(VerificationStatus::Failed(result.to_string()))
}

/// Verifies contracts through an Etherscan-compatible API.
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_key: String,
    config: ExplorerConfig,
}

impl EtherscanVerifier {
    pub fn new(api_key: impl Into<String>, config: ExplorerConfig) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            api_key: api_key.into(),
            config,
        })
    }

    async fn submit(
        &self,
        chain_id: u64,
        address: Address,
        constructor_args: &Bytes,
    ) -> Result<ApiResponse> {
        let source = std::fs::read_to_string(&self.config.source_path).context(format!(
            "Failed to read standard JSON input {}",
            self.config.source_path.display()
        ))?;

        let chain_id = chain_id.to_string();
        let address = address.to_string();
        let constructor_args = hex::encode(constructor_args);

        let form = [
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("apikey", self.api_key.as_str()),
            ("contractaddress", address.as_str()),
            ("sourceCode", source.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", self.config.contract_name.as_str()),
            ("compilerversion", self.config.compiler_version.as_str()),
            // The misspelling is part of the API.
            ("constructorArguements", constructor_args.as_str()),
        ];

        self.client
            .post(self.config.api_url.clone())
            .query(&[("chainid", chain_id.as_str())])
            .form(&form)
            .send()
            .await
            .context("Failed to submit verification request")?
            .error_for_status()
            .context("Explorer rejected the verification request")?
            .json()
            .await
            .context("Failed to parse verification response")
    }

    async fn check_status(&self, chain_id: u64, guid: &str) -> Result<ApiResponse> {
        let chain_id = chain_id.to_string();
        self.client
            .get(self.config.api_url.clone())
            .query(&[
                ("chainid", chain_id.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to query verification status")?
            .error_for_status()
            .context("Explorer rejected the status query")?
            .json()
            .await
            .context("Failed to parse verification status")
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify(
        &self,
        chain_id: u64,
        address: Address,
        constructor_args: &Bytes,
    ) -> Result<VerificationStatus> {
        let response = self.submit(chain_id, address, constructor_args).await?;

        let guid = match classify_submission(&response) {
            Submission::Accepted(guid) => guid,
            Submission::Settled(status) => return Ok(status),
        };

        tracing::info!(%address, %guid, "Verification submitted, polling status...");

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        for attempt in 1..=self.config.poll_attempts {
            tokio::time::sleep(interval).await;

            let response = self.check_status(chain_id, &guid).await?;
            if let Some(status) = classify_status(&response) {
                return Ok(status);
            }
            tracing::debug!(attempt, %guid, result = %response.result, "Verification pending");
        }

        anyhow::bail!(
            "Verification {} still pending after {} attempts",
            guid,
            self.config.poll_attempts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, message: &str, result: &str) -> ApiResponse {
        ApiResponse {
            status: status.to_string(),
            message: message.to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_submission_answers() {
        let guid = "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn";
        assert_eq!(
            classify_submission(&response("1", "OK", guid)),
            Submission::Accepted(guid.to_string())
        );
        assert_eq!(
            classify_submission(&response("0", "NOTOK", "Contract source code already verified")),
            Submission::Settled(VerificationStatus::AlreadyVerified)
        );
        assert!(matches!(
            classify_submission(&response("0", "NOTOK", "Invalid API Key")),
            Submission::Settled(VerificationStatus::Failed(reason))
                if reason.contains("Invalid API Key")
        ));
    }

    #[test]
    fn test_status_answers() {
        assert_eq!(classify_status(&response("0", "NOTOK", "Pending in queue")), None);
        assert_eq!(
            classify_status(&response("1", "OK", "Pass - Verified")),
            Some(VerificationStatus::Verified)
        );
        assert_eq!(
            classify_status(&response("1", "OK", "Already Verified")),
            Some(VerificationStatus::AlreadyVerified)
        );
        assert_eq!(
            classify_status(&response("0", "NOTOK", "Fail - Unable to verify")),
            Some(VerificationStatus::Failed("Fail - Unable to verify".to_string()))
        );
    }

    #[test]
    fn test_response_from_json() {
        let parsed: ApiResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":"abc"}"#).unwrap();
        assert!(parsed.is_ok());
        assert_eq!(parsed.result, "abc");
    }
}
