//! Voicebot - client for a turn-based voice assistant service
//!
//! The crate covers the orchestration side of the client: resolving a
//! configured endpoint through the provisioning service, routing the user into
//! the activation or chat flow, and driving the device state machine of a live
//! voice session.

pub mod config;
pub mod form;
pub mod messages;
pub mod provisioning;
pub mod routing;
pub mod session;
pub mod settings;
pub mod state;
pub mod utils;

use thiserror::Error;

pub use form::ValidationErrors;
pub use provisioning::ProvisioningError;

#[derive(Error, Debug, Clone)]
pub enum VoicebotError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("Fatal device error: {0}")]
    FatalDevice(String),

    #[error("A configuration submission is already in flight")]
    SubmissionInFlight,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for VoicebotError {
    fn from(e: std::io::Error) -> Self {
        VoicebotError::IOError(e.to_string())
    }
}

impl VoicebotError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Fixed by editing the form
            VoicebotError::Validation(_) => true,
            // Retry is a user-initiated re-submission
            VoicebotError::Provisioning(e) => e.is_retryable(),
            // Terminal for the session, needs a restart
            VoicebotError::FatalDevice(_) => false,
            VoicebotError::SubmissionInFlight => true,
            VoicebotError::Settings(_) => false,
            VoicebotError::Transport(_) => true,
            VoicebotError::Channel(_) => false,
            VoicebotError::Config(_) => false,
            VoicebotError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoicebotError::Validation(_) => {
                "Some fields are invalid. Please correct them and submit again.".to_string()
            }
            VoicebotError::Provisioning(e) if e.is_retryable() => {
                "Could not reach the provisioning service. Please try again.".to_string()
            }
            VoicebotError::Provisioning(_) => {
                "The provisioning service rejected the request. Please check the URL.".to_string()
            }
            VoicebotError::FatalDevice(_) => {
                "The voice session failed. Please restart the session.".to_string()
            }
            VoicebotError::SubmissionInFlight => {
                "Still connecting. Please wait for the current attempt to finish.".to_string()
            }
            VoicebotError::Settings(_) => "Could not read or save settings.".to_string(),
            VoicebotError::Transport(_) => {
                "Connection to the voice service failed. Please try again.".to_string()
            }
            VoicebotError::Channel(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            VoicebotError::Config(_) => "Configuration error. Please check settings.".to_string(),
            VoicebotError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoicebotError>;
