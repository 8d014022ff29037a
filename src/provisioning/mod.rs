//! Provisioning: resolve a configured endpoint into "activated" or "needs
//! activation"
//!
//! The exchange is a one-shot request against the provisioning (OTA)
//! service. Callers own retry policy; nothing here retries on its own.

mod ota;

pub use ota::OtaClient;

use crate::settings::{LiveConnectionConfig, SessionConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pairing code the user enters elsewhere to bind this device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationInfo {
    pub code: String,
    /// Prompt sent along with the code, if any
    #[serde(default)]
    pub message: Option<String>,
}

impl ActivationInfo {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }
}

/// Outcome of one provisioning exchange
///
/// Deliberately not `Clone`: a result is handed to the router by value and
/// is gone afterwards.
#[derive(Debug, PartialEq, Eq)]
pub enum ProvisioningResult {
    /// Device is bound; here is how to reach the live service
    Activated { connection: LiveConnectionConfig },
    /// Device must be paired first
    PendingActivation { activation: ActivationInfo },
}

impl ProvisioningResult {
    pub fn is_activated(&self) -> bool {
        matches!(self, ProvisioningResult::Activated { .. })
    }

    pub fn activation(&self) -> Option<&ActivationInfo> {
        match self {
            ProvisioningResult::PendingActivation { activation } => Some(activation),
            ProvisioningResult::Activated { .. } => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("provisioning request timed out")]
    Timeout,

    #[error("could not connect to provisioning service: {0}")]
    Connect(String),

    #[error("provisioning service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode provisioning response: {0}")]
    Decode(String),

    #[error("invalid provisioning request: {0}")]
    Request(String),
}

impl ProvisioningError {
    /// Whether re-submitting the same configuration may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisioningError::Timeout => true,
            ProvisioningError::Connect(_) => true,
            ProvisioningError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ProvisioningError::Decode(_) => false,
            ProvisioningError::Request(_) => false,
        }
    }
}

/// Performs the version/activation check for a session config
///
/// Concurrent calls are not deduplicated here; the submitting workflow keeps
/// at most one exchange in flight.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    async fn check(
        &self,
        config: &SessionConfig,
    ) -> std::result::Result<ProvisioningResult, ProvisioningError>;
}
