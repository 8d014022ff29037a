use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
    /// Any other role the service attaches to a transcript line
    Other(String),
}

impl Sender {
    /// Map a wire role (`"user"`, `"assistant"`, ...) to a sender
    pub fn from_role(role: &str) -> Self {
        match role {
            "user" => Sender::User,
            "assistant" => Sender::Assistant,
            other => Sender::Other(other.to_string()),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
            Sender::Other(role) => write!(f, "{}", role),
        }
    }
}

/// One line of the conversation transcript. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_from_role() {
        assert_eq!(Sender::from_role("user"), Sender::User);
        assert_eq!(Sender::from_role("assistant"), Sender::Assistant);
        assert_eq!(Sender::from_role("system"), Sender::Other("system".into()));
        assert_eq!(Sender::from_role("system").to_string(), "system");
    }

    #[test]
    fn test_messages_get_distinct_ids() {
        let a = ChatMessage::user("hello");
        let b = ChatMessage::user("hello");
        assert_ne!(a.id, b.id);
        assert!(a.sender.is_user());
    }
}
