//! Configuration form: draft, validation and submission

mod workflow;

pub use workflow::{SubmissionWorkflow, SubmitStatus};

use crate::settings::{SessionConfig, SettingsStore, TransportKind};
use std::collections::BTreeMap;
use std::fmt;

pub const FIELD_ENDPOINT_URL: &str = "endpoint_url";
pub const FIELD_PROVISIONING_URL: &str = "provisioning_url";

/// User-editable configuration before it is submitted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigDraft {
    pub transport_kind: TransportKind,
    pub endpoint_url: String,
    pub provisioning_url: String,
    pub skip_config_after_connect: bool,
}

impl Default for ConfigDraft {
    fn default() -> Self {
        SessionConfig::default().into()
    }
}

impl From<SessionConfig> for ConfigDraft {
    fn from(config: SessionConfig) -> Self {
        Self {
            transport_kind: config.transport_kind,
            endpoint_url: config.endpoint_url,
            provisioning_url: config.provisioning_url,
            skip_config_after_connect: config.skip_config_after_connect,
        }
    }
}

impl ConfigDraft {
    /// Seed the form from persisted settings
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        settings.snapshot().into()
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            transport_kind: self.transport_kind,
            endpoint_url: self.endpoint_url.trim().to_string(),
            provisioning_url: self.provisioning_url.trim().to_string(),
            skip_config_after_connect: self.skip_config_after_connect,
        }
    }
}

/// Field name -> error message. Empty means the draft is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", fields.join("; "))
    }
}

/// Field-level validation of a draft
pub fn validate_draft(draft: &ConfigDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if draft.endpoint_url.trim().is_empty() {
        errors.insert(FIELD_ENDPOINT_URL, "Endpoint URL must not be empty");
    }
    if draft.provisioning_url.trim().is_empty() {
        errors.insert(FIELD_PROVISIONING_URL, "Provisioning URL must not be empty");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    #[test]
    fn test_default_draft_is_valid() {
        assert!(validate_draft(&ConfigDraft::default()).is_empty());
    }

    #[test]
    fn test_empty_urls_are_reported_per_field() {
        let draft = ConfigDraft {
            endpoint_url: "  ".into(),
            provisioning_url: String::new(),
            ..ConfigDraft::default()
        };
        let errors = validate_draft(&draft);
        assert_eq!(errors.len(), 2);
        assert!(errors.get(FIELD_ENDPOINT_URL).is_some());
        assert!(errors.get(FIELD_PROVISIONING_URL).is_some());
        assert!(errors.to_string().contains("endpoint_url"));
    }

    #[test]
    fn test_draft_seeded_from_settings() {
        let store = MemorySettingsStore::new();
        store.set_skip_config_after_connect(false).unwrap();
        store.set_endpoint_url(Some("wss://saved".into())).unwrap();

        let draft = ConfigDraft::from_settings(&store);
        assert!(!draft.skip_config_after_connect);
        assert_eq!(draft.endpoint_url, "wss://saved");
    }

    #[test]
    fn test_session_config_trims_urls() {
        let draft = ConfigDraft {
            endpoint_url: " wss://x ".into(),
            ..ConfigDraft::default()
        };
        assert_eq!(draft.to_session_config().endpoint_url, "wss://x");
    }
}
