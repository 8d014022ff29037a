//! Device state of a voice session
//!
//! `DeviceState` is produced by the transport and mirrored by the session
//! coordinator. The presentation layer only ever reads it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mode of the voice client
///
/// Exactly one value is current at any instant. The values besides the core
/// `Starting`..`FatalError` set are reported by some transports and are passed
/// through without interpretation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Unknown,
    /// Process launched, transport not yet started
    #[default]
    Starting,
    WifiConfiguring,
    /// Transport handshake in progress
    Connecting,
    /// Connected and ready for a new turn
    Idle,
    /// Capturing audio from the user
    Listening,
    /// Playing back the assistant reply
    Speaking,
    Upgrading,
    Activating,
    /// Irrecoverable for this session
    FatalError,
}

impl DeviceState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DeviceState::Idle)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, DeviceState::Listening)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, DeviceState::Speaking)
    }

    /// Terminal states end the session; only an external restart leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeviceState::FatalError)
    }

    /// Check if a conversation turn is in progress
    pub fn in_conversation(&self) -> bool {
        matches!(self, DeviceState::Listening | DeviceState::Speaking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Unknown => "unknown",
            DeviceState::Starting => "starting",
            DeviceState::WifiConfiguring => "wifi_configuring",
            DeviceState::Connecting => "connecting",
            DeviceState::Idle => "idle",
            DeviceState::Listening => "listening",
            DeviceState::Speaking => "speaking",
            DeviceState::Upgrading => "upgrading",
            DeviceState::Activating => "activating",
            DeviceState::FatalError => "fatal_error",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an in-progress reply is being interrupted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Unspecified, e.g. the user tapped the interrupt button
    #[default]
    None,
    WakeWordDetected,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::None => write!(f, "none"),
            AbortReason::WakeWordDetected => write!(f, "wake_word_detected"),
        }
    }
}

/// Labels the assistant may attach to a reply
pub const KNOWN_EMOTIONS: &[&str] = &[
    "neutral",
    "happy",
    "laughing",
    "funny",
    "sad",
    "angry",
    "crying",
    "loving",
    "embarrassed",
    "surprised",
    "shocked",
    "thinking",
    "winking",
    "cool",
    "relaxed",
    "delicious",
    "kissy",
    "confident",
    "sleepy",
    "silly",
    "confused",
];

/// Latest emotion label reported by the assistant
///
/// Always one of [`KNOWN_EMOTIONS`]; anything else collapses to `neutral`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Emotion(&'static str);

impl Emotion {
    pub const NEUTRAL: Emotion = Emotion("neutral");

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        KNOWN_EMOTIONS
            .iter()
            .copied()
            .find(|known| known.eq_ignore_ascii_case(label))
            .map(Emotion)
            .unwrap_or(Self::NEUTRAL)
    }

    pub fn label(&self) -> &'static str {
        self.0
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_starting() {
        assert_eq!(DeviceState::default(), DeviceState::Starting);
    }

    #[test]
    fn test_state_predicates() {
        assert!(DeviceState::Idle.is_idle());
        assert!(DeviceState::Listening.is_listening());
        assert!(!DeviceState::Listening.is_speaking());
        assert!(DeviceState::Speaking.is_speaking());
        assert!(DeviceState::Listening.in_conversation());
        assert!(DeviceState::Speaking.in_conversation());
        assert!(!DeviceState::Connecting.in_conversation());
        assert!(DeviceState::FatalError.is_terminal());
        assert!(!DeviceState::Upgrading.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DeviceState::FatalError.to_string(), "fatal_error");
        assert_eq!(DeviceState::Listening.to_string(), "listening");
    }

    #[test]
    fn test_emotion_parsing() {
        assert_eq!(Emotion::from_label("happy").label(), "happy");
        assert_eq!(Emotion::from_label(" Thinking ").label(), "thinking");
        assert!(Emotion::from_label("furious").is_neutral());
        assert!(Emotion::from_label("").is_neutral());
        assert!(Emotion::default().is_neutral());
    }

    #[test]
    fn test_abort_reason_default() {
        assert_eq!(AbortReason::default(), AbortReason::None);
        assert_eq!(AbortReason::WakeWordDetected.to_string(), "wake_word_detected");
    }
}
