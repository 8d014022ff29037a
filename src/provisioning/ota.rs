//! HTTP client for the OTA/activation endpoint

use super::{ActivationInfo, ProvisioningClient, ProvisioningError, ProvisioningResult};
use crate::config::ClientConfig;
use crate::settings::{
    DeviceIdentity, LiveConnectionConfig, MqttConfig, SessionConfig, WebSocketConfig,
};
use crate::{Result, VoicebotError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct DeviceReport<'a> {
    version: u32,
    language: &'a str,
    mac_address: &'a str,
    uuid: String,
    application: ApplicationReport<'a>,
    board: BoardReport<'a>,
}

#[derive(Debug, Serialize)]
struct ApplicationReport<'a> {
    name: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct BoardReport<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    mac: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct OtaResponse {
    #[serde(default)]
    activation: Option<ActivationPayload>,
    #[serde(default)]
    mqtt: Option<MqttConfig>,
    #[serde(default)]
    websocket: Option<WebSocketConfig>,
    #[serde(default)]
    firmware: Option<FirmwarePayload>,
}

#[derive(Debug, Deserialize)]
struct ActivationPayload {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirmwarePayload {
    version: String,
    #[serde(default)]
    url: Option<String>,
}

/// Provisioning client speaking the OTA check protocol over HTTP
pub struct OtaClient {
    http: reqwest::Client,
    device_id: String,
    client_id: String,
    board_name: String,
    app_version: String,
    language: String,
}

impl OtaClient {
    /// `identity` is what the service binds the activation to; resolve it
    /// with [`ClientConfig::resolve_identity`] so it is stable across launches.
    pub fn new(config: &ClientConfig, identity: &DeviceIdentity) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", config.board_name, config.app_version))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| VoicebotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            device_id: identity.device_id.clone(),
            client_id: identity.client_id.to_string(),
            board_name: config.board_name.clone(),
            app_version: config.app_version.clone(),
            language: config.language.clone(),
        })
    }

    fn report(&self) -> DeviceReport<'_> {
        DeviceReport {
            version: 2,
            language: &self.language,
            mac_address: &self.device_id,
            uuid: self.client_id.clone(),
            application: ApplicationReport {
                name: env!("CARGO_PKG_NAME"),
                version: &self.app_version,
            },
            board: BoardReport {
                kind: &self.board_name,
                name: &self.board_name,
                mac: &self.device_id,
            },
        }
    }
}

#[async_trait]
impl ProvisioningClient for OtaClient {
    async fn check(
        &self,
        config: &SessionConfig,
    ) -> std::result::Result<ProvisioningResult, ProvisioningError> {
        info!("Checking device activation at {}", config.provisioning_url);

        let response = self
            .http
            .post(&config.provisioning_url)
            .header("Device-Id", &self.device_id)
            .header("Client-Id", &self.client_id)
            .header("Accept-Language", &self.language)
            .json(&self.report())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            warn!("Provisioning service returned {}", status);
            return Err(ProvisioningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Interpret a successful response body
pub(crate) fn parse_response(
    body: &str,
) -> std::result::Result<ProvisioningResult, ProvisioningError> {
    let response: OtaResponse =
        serde_json::from_str(body).map_err(|e| ProvisioningError::Decode(e.to_string()))?;

    if let Some(firmware) = &response.firmware {
        debug!(
            "Firmware {} available at {}",
            firmware.version,
            firmware.url.as_deref().unwrap_or("-")
        );
    }

    match response.activation {
        Some(activation) => {
            info!("Device requires activation");
            Ok(ProvisioningResult::PendingActivation {
                activation: ActivationInfo {
                    code: activation.code,
                    message: activation.message,
                },
            })
        }
        None => {
            let connection = LiveConnectionConfig {
                mqtt: response.mqtt,
                websocket: response.websocket,
            };
            if connection.is_empty() {
                debug!("Provisioning response carried no live-connection parameters");
            }
            info!("Device is activated");
            Ok(ProvisioningResult::Activated { connection })
        }
    }
}

fn classify(e: reqwest::Error) -> ProvisioningError {
    if e.is_timeout() {
        ProvisioningError::Timeout
    } else if e.is_builder() {
        ProvisioningError::Request(e.to_string())
    } else if e.is_decode() {
        ProvisioningError::Decode(e.to_string())
    } else {
        ProvisioningError::Connect(e.to_string())
    }
}
