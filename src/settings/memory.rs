use super::{DeviceIdentity, LiveConnectionConfig, SettingsStore, StoredSettings, TransportKind};
use crate::Result;
use parking_lot::RwLock;

/// Settings kept in process memory only
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: RwLock<StoredSettings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn transport_kind(&self) -> TransportKind {
        self.inner.read().transport_kind
    }

    fn set_transport_kind(&self, kind: TransportKind) -> Result<()> {
        self.inner.write().transport_kind = kind;
        Ok(())
    }

    fn endpoint_url(&self) -> Option<String> {
        self.inner.read().endpoint_url.clone()
    }

    fn set_endpoint_url(&self, url: Option<String>) -> Result<()> {
        self.inner.write().endpoint_url = url;
        Ok(())
    }

    fn provisioning_url(&self) -> Option<String> {
        self.inner.read().provisioning_url.clone()
    }

    fn set_provisioning_url(&self, url: Option<String>) -> Result<()> {
        self.inner.write().provisioning_url = url;
        Ok(())
    }

    fn skip_config_after_connect(&self) -> bool {
        self.inner.read().skip_config_after_connect
    }

    fn set_skip_config_after_connect(&self, skip: bool) -> Result<()> {
        self.inner.write().skip_config_after_connect = skip;
        Ok(())
    }

    fn live_connection_config(&self) -> Option<LiveConnectionConfig> {
        self.inner.read().live_connection.clone()
    }

    fn set_live_connection_config(&self, config: Option<LiveConnectionConfig>) -> Result<()> {
        self.inner.write().live_connection = config;
        Ok(())
    }

    fn device_identity(&self) -> Option<DeviceIdentity> {
        self.inner.read().device_identity.clone()
    }

    fn set_device_identity(&self, identity: DeviceIdentity) -> Result<()> {
        self.inner.write().device_identity = Some(identity);
        Ok(())
    }
}
