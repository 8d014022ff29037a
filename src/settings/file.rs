//! JSON-file backed settings

use super::{DeviceIdentity, LiveConnectionConfig, SettingsStore, StoredSettings, TransportKind};
use crate::{Result, VoicebotError};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SETTINGS_FILE: &str = "settings.json";

/// Settings persisted as a JSON document, rewritten on every change
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    inner: RwLock<StoredSettings>,
}

impl FileSettingsStore {
    /// Open the store at `path`. A missing file yields defaults; a file that
    /// cannot be parsed is an error rather than being silently replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                VoicebotError::Settings(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            StoredSettings::default()
        };

        info!("Settings loaded from {}", path.display());
        Ok(Self {
            path,
            inner: RwLock::new(settings),
        })
    }

    /// Open the store in the user's configuration directory
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("voicebot").join(SETTINGS_FILE))
            .ok_or_else(|| VoicebotError::Settings("No configuration directory available".into()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSettings)) -> Result<()> {
        let mut current = self.inner.write();
        let mut next = current.clone();
        apply(&mut next);
        self.persist(&next)?;
        *current = next;
        Ok(())
    }

    fn persist(&self, settings: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| VoicebotError::Settings(format!("Failed to encode settings: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn transport_kind(&self) -> TransportKind {
        self.inner.read().transport_kind
    }

    fn set_transport_kind(&self, kind: TransportKind) -> Result<()> {
        self.update(|s| s.transport_kind = kind)
    }

    fn endpoint_url(&self) -> Option<String> {
        self.inner.read().endpoint_url.clone()
    }

    fn set_endpoint_url(&self, url: Option<String>) -> Result<()> {
        self.update(|s| s.endpoint_url = url)
    }

    fn provisioning_url(&self) -> Option<String> {
        self.inner.read().provisioning_url.clone()
    }

    fn set_provisioning_url(&self, url: Option<String>) -> Result<()> {
        self.update(|s| s.provisioning_url = url)
    }

    fn skip_config_after_connect(&self) -> bool {
        self.inner.read().skip_config_after_connect
    }

    fn set_skip_config_after_connect(&self, skip: bool) -> Result<()> {
        self.update(|s| s.skip_config_after_connect = skip)
    }

    fn live_connection_config(&self) -> Option<LiveConnectionConfig> {
        self.inner.read().live_connection.clone()
    }

    fn set_live_connection_config(&self, config: Option<LiveConnectionConfig>) -> Result<()> {
        self.update(|s| s.live_connection = config)
    }

    fn device_identity(&self) -> Option<DeviceIdentity> {
        self.inner.read().device_identity.clone()
    }

    fn set_device_identity(&self, identity: DeviceIdentity) -> Result<()> {
        self.update(|s| s.device_identity = Some(identity))
    }
}
