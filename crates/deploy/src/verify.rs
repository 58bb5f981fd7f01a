//! Source verification gate.
//!
//! Verification only makes sense on persistent chains, and only when a block explorer
//! credential is available. The gateway decides whether to submit and never fails the
//! run: every outcome, including errors, is folded into a [`VerificationStatus`].

use std::fmt::{self, Display};

use crate::{
    client::SourceVerifier,
    orchestrator::{DeployedArtifact, DeploymentArgs},
    registry::ChainProfile,
};

/// Why verification was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SkipReason {
    #[strum(serialize = "ephemeral chain")]
    EphemeralChain,
    #[strum(serialize = "no explorer credential")]
    NoCredential,
}

/// Outcome of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    /// The explorer already had the source for this address.
    AlreadyVerified,
    Skipped(SkipReason),
    Failed(String),
}

impl VerificationStatus {
    /// Whether the contract source is available on the explorer after this attempt.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified | Self::AlreadyVerified)
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::AlreadyVerified => write!(f, "already verified"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Decides whether a deployed lottery is submitted for verification.
///
/// A gateway without a verifier behaves as if no explorer credential was supplied.
pub struct VerificationGateway<V> {
    verifier: Option<V>,
}

impl<V: SourceVerifier> VerificationGateway<V> {
    pub fn new(verifier: Option<V>) -> Self {
        Self { verifier }
    }

    pub fn is_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Submit `artifact` for verification if the chain is persistent and a verifier is set.
    pub async fn verify(
        &self,
        artifact: &DeployedArtifact,
        args: &DeploymentArgs,
        profile: &ChainProfile,
    ) -> VerificationStatus {
        if profile.is_ephemeral {
            tracing::debug!(
                chain_id = profile.chain_id,
                "Skipping verification on ephemeral chain"
            );
            return VerificationStatus::Skipped(SkipReason::EphemeralChain);
        }

        let Some(verifier) = &self.verifier else {
            tracing::info!(
                chain_id = profile.chain_id,
                "No explorer credential supplied, skipping verification"
            );
            return VerificationStatus::Skipped(SkipReason::NoCredential);
        };

        tracing::info!(
            address = %artifact.address,
            chain_id = profile.chain_id,
            "Verifying lottery..."
        );

        let status = verifier
            .verify(profile.chain_id, artifact.address, &args.abi_encode())
            .await
            .unwrap_or_else(|e| VerificationStatus::Failed(format!("{e:#}")));

        // Transport errors and explorer rejections alike.
        if let VerificationStatus::Failed(reason) = &status {
            tracing::warn!(
                address = %artifact.address,
                error = %reason,
                "Verification failed, the deployment is kept"
            );
        }

        status
    }
}
