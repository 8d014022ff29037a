//! Client configuration
//!
//! Identity overrides for the provisioning service plus tuning knobs for the
//! session. Loaded from an optional TOML file; every field has a default.

use crate::settings::{DeviceIdentity, SettingsStore};
use crate::{Result, VoicebotError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Configuration for the complete client
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Pinned device identifier (colon-separated MAC). When unset the
    /// identity generated on first launch and kept in the settings store is
    /// used.
    pub device_id: Option<String>,

    /// Pinned client identifier, same fallback as `device_id`
    pub client_id: Option<Uuid>,

    /// Board name reported to the provisioning service
    pub board_name: String,

    /// Application version reported to the provisioning service
    pub app_version: String,

    /// Preferred language of the assistant
    pub language: String,

    /// HTTP timeout for the provisioning exchange
    pub request_timeout_ms: u64,

    /// Settings file location; `None` uses the user configuration directory
    pub settings_path: Option<PathBuf>,

    /// Buffer size for session command and event channels
    pub channel_buffer_size: usize,

    /// How long the simulated transport "speaks" a reply
    pub simulated_reply_ms: u64,

    /// How long an issued intent waits for a state report before it may be
    /// issued again
    pub intent_ack_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            client_id: None,
            board_name: "voicebot-rs".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            language: "zh-CN".to_string(),
            request_timeout_ms: 10_000,
            settings_path: None,
            channel_buffer_size: 100,
            simulated_reply_ms: 1_500,
            intent_ack_timeout_ms: 5_000,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VoicebotError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| VoicebotError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(content).map_err(|e| VoicebotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout: u64) -> Self {
        self.request_timeout_ms = timeout;
        self
    }

    pub fn with_simulated_reply_ms(mut self, reply_ms: u64) -> Self {
        self.simulated_reply_ms = reply_ms;
        self
    }

    /// Identity presented to the provisioning service
    ///
    /// Pinned values win; anything else comes from the settings store, which
    /// generates and saves an identity the first time it is asked.
    pub fn resolve_identity(&self, settings: &dyn SettingsStore) -> Result<DeviceIdentity> {
        let mut identity = settings.device_identity_or_init()?;
        if let Some(device_id) = &self.device_id {
            identity.device_id = device_id.clone();
        }
        if let Some(client_id) = self.client_id {
            identity.client_id = client_id;
        }
        Ok(identity)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.device_id.as_ref().is_some_and(|id| id.trim().is_empty()) {
            return Err(VoicebotError::Config("device_id must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(VoicebotError::Config(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.channel_buffer_size == 0 {
            return Err(VoicebotError::Config(
                "channel_buffer_size must be greater than zero".into(),
            ));
        }
        if self.intent_ack_timeout_ms == 0 {
            return Err(VoicebotError::Config(
                "intent_ack_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.device_id.is_none());
        assert_eq!(config.intent_ack_timeout_ms, 5_000);
    }

    #[test]
    fn test_identity_generated_once_and_reused() {
        let settings = MemorySettingsStore::new();
        let config = ClientConfig::default();

        let first = config.resolve_identity(&settings).unwrap();
        let second = config.resolve_identity(&settings).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.device_id.split(':').count(), 6);
        assert_eq!(settings.device_identity(), Some(first));
    }

    #[test]
    fn test_pinned_identity_overrides_stored() {
        let settings = MemorySettingsStore::new();
        let stored = ClientConfig::default().resolve_identity(&settings).unwrap();

        let pinned = ClientConfig::default()
            .with_device_id("02:00:00:00:00:01")
            .resolve_identity(&settings)
            .unwrap();
        assert_eq!(pinned.device_id, "02:00:00:00:00:01");
        assert_eq!(pinned.client_id, stored.client_id);
        assert_eq!(settings.device_identity(), Some(stored));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new()
            .with_device_id("aa:bb:cc:dd:ee:ff")
            .with_request_timeout_ms(500)
            .with_simulated_reply_ms(250)
            .with_settings_path("/tmp/voicebot.json");

        assert_eq!(config.device_id.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.simulated_reply_ms, 250);
        assert_eq!(
            config.settings_path.as_deref(),
            Some(Path::new("/tmp/voicebot.json"))
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            device_id = "02:00:00:00:00:01"
            language = "en-US"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_id.as_deref(), Some("02:00:00:00:00:01"));
        assert_eq!(config.language, "en-US");
        assert_eq!(config.channel_buffer_size, 100);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let err = ClientConfig::from_toml("request_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, VoicebotError::Config(_)));

        let err = ClientConfig::from_toml("device_id = 5").unwrap_err();
        assert!(matches!(err, VoicebotError::Config(_)));
    }
}
