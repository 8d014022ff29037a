//! Durable client settings
//!
//! The store is always injected as a handle (`Arc<dyn SettingsStore>`); nothing
//! in the crate reaches for it through a global.

mod file;
mod memory;

pub use file::FileSettingsStore;
pub use memory::MemorySettingsStore;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_ENDPOINT_URL: &str = "wss://api.tenclass.net/xiaozhi/v1/";
pub const DEFAULT_PROVISIONING_URL: &str = "https://api.tenclass.net/xiaozhi/ota/";

/// Which persistent connection carries the live voice protocol
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    #[serde(rename = "mqtt")]
    Mqtt,
    #[default]
    #[serde(rename = "websockets")]
    WebSockets,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Mqtt => write!(f, "MQTT"),
            TransportKind::WebSockets => write!(f, "WebSockets"),
        }
    }
}

/// Broker parameters handed out by the provisioning service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub endpoint: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub publish_topic: String,
    #[serde(default)]
    pub subscribe_topic: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Live-connection parameters resolved by a successful provisioning exchange
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConnectionConfig {
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
    #[serde(default)]
    pub websocket: Option<WebSocketConfig>,
}

impl LiveConnectionConfig {
    pub fn is_empty(&self) -> bool {
        self.mqtt.is_none() && self.websocket.is_none()
    }
}

/// Identity the provisioning service binds an activation to
///
/// Generated once per installation and kept in the store, so a device bound
/// with an activation code is recognised on the next launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Colon-separated MAC-style identifier
    pub device_id: String,
    pub client_id: Uuid,
}

impl DeviceIdentity {
    /// Random locally administered unicast MAC plus a fresh client id
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let first = (bytes[0] | 0x02) & 0xfe;
        let device_id = std::iter::once(first)
            .chain(bytes[1..6].iter().copied())
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":");

        Self {
            device_id,
            client_id: Uuid::new_v4(),
        }
    }
}

/// Snapshot of the settings a session is started from
///
/// Read once at submission time; later edits to the store do not reach a
/// session that is already running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub transport_kind: TransportKind,
    pub endpoint_url: String,
    pub provisioning_url: String,
    pub skip_config_after_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport_kind: TransportKind::default(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            provisioning_url: DEFAULT_PROVISIONING_URL.to_string(),
            skip_config_after_connect: true,
        }
    }
}

/// Durable key/value state shared by the form flow and the session
///
/// All operations are synchronous and last-write-wins.
pub trait SettingsStore: Send + Sync {
    fn transport_kind(&self) -> TransportKind;
    fn set_transport_kind(&self, kind: TransportKind) -> Result<()>;

    fn endpoint_url(&self) -> Option<String>;
    fn set_endpoint_url(&self, url: Option<String>) -> Result<()>;

    fn provisioning_url(&self) -> Option<String>;
    fn set_provisioning_url(&self, url: Option<String>) -> Result<()>;

    /// Defaults to `true` when never written
    fn skip_config_after_connect(&self) -> bool;
    fn set_skip_config_after_connect(&self, skip: bool) -> Result<()>;

    fn live_connection_config(&self) -> Option<LiveConnectionConfig>;
    fn set_live_connection_config(&self, config: Option<LiveConnectionConfig>) -> Result<()>;

    fn device_identity(&self) -> Option<DeviceIdentity>;
    fn set_device_identity(&self, identity: DeviceIdentity) -> Result<()>;

    /// Stored identity, generating and saving one on first use
    fn device_identity_or_init(&self) -> Result<DeviceIdentity> {
        if let Some(identity) = self.device_identity() {
            return Ok(identity);
        }
        let identity = DeviceIdentity::generate();
        info!("Generated device identity {}", identity.device_id);
        self.set_device_identity(identity.clone())?;
        Ok(identity)
    }

    /// Build a session config, filling unset URLs with the defaults
    fn snapshot(&self) -> SessionConfig {
        SessionConfig {
            transport_kind: self.transport_kind(),
            endpoint_url: self
                .endpoint_url()
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string()),
            provisioning_url: self
                .provisioning_url()
                .unwrap_or_else(|| DEFAULT_PROVISIONING_URL.to_string()),
            skip_config_after_connect: self.skip_config_after_connect(),
        }
    }
}

/// On-disk shape of the settings document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredSettings {
    #[serde(default)]
    pub transport_kind: TransportKind,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub provisioning_url: Option<String>,
    #[serde(default = "default_skip")]
    pub skip_config_after_connect: bool,
    #[serde(default)]
    pub live_connection: Option<LiveConnectionConfig>,
    #[serde(default)]
    pub device_identity: Option<DeviceIdentity>,
}

fn default_skip() -> bool {
    true
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            transport_kind: TransportKind::default(),
            endpoint_url: None,
            provisioning_url: None,
            skip_config_after_connect: default_skip(),
            live_connection: None,
            device_identity: None,
        }
    }
}
