//! Seam between the roster core and the chat platform.

#[cfg(test)]
pub(crate) mod recording;
#[cfg(feature = "telegram")]
pub mod telegram;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::{confirmation::PromptState, roster::Player};

/// Destination identifier on the chat platform (user, group or channel).
pub type ChatId = i64;

/// Identity of whoever sent an inbound message, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Platform user id.
    pub id: ChatId,
    /// First name; platforms may omit it.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Platform username.
    pub handle: Option<String>,
}

impl Sender {
    /// Player record for this sender, or `None` without a usable first name.
    pub fn to_player(&self) -> Option<Player> {
        let first_name = self
            .first_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())?;
        Some(Player {
            id: self.id,
            first_name: first_name.to_string(),
            last_name: self
                .last_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            handle: self.handle.clone(),
        })
    }
}

/// Free-text message received from a participant.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Conversation the reply should go to.
    pub chat_id: ChatId,
    /// Who wrote it.
    pub sender: Sender,
    /// Raw text.
    pub text: String,
}

/// Message to deliver to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Destination.
    pub chat_id: ChatId,
    /// Text body.
    pub text: String,
    /// Keyboard to render, if the transport should change it.
    pub keyboard: Option<PromptState>,
}

impl OutgoingMessage {
    /// Plain text without keyboard changes.
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    /// Text plus the keyboard matching `prompt`.
    pub fn with_prompt(chat_id: ChatId, text: impl Into<String>, prompt: PromptState) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: Some(prompt),
        }
    }
}

/// Failures reported by a chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The platform refused or could not deliver the message.
    #[error("delivery to chat {chat_id} failed: {reason}")]
    Delivery { chat_id: ChatId, reason: String },
    /// The platform did not answer in time.
    #[error("delivery to chat {chat_id} timed out")]
    Timeout { chat_id: ChatId },
    /// Fetching inbound updates failed.
    #[error("receiving updates failed: {0}")]
    Receive(String),
    /// The transport client could not be created.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

/// Outbound capability of the chat platform.
pub trait ChatTransport: Send + Sync {
    /// Deliver one message. Implementations should not retry.
    fn send(&self, message: OutgoingMessage) -> BoxFuture<'static, Result<(), TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(first: Option<&str>, last: Option<&str>) -> Sender {
        Sender {
            id: 9,
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
            handle: Some("nine".into()),
        }
    }

    #[test]
    fn sender_without_first_name_is_not_a_player() {
        assert!(sender(None, Some("Smith")).to_player().is_none());
        assert!(sender(Some("  "), None).to_player().is_none());
    }

    #[test]
    fn sender_names_are_trimmed() {
        let player = sender(Some(" Anna "), Some("  ")).to_player().unwrap();
        assert_eq!(player.first_name, "Anna");
        assert_eq!(player.last_name, None);
        assert_eq!(player.handle.as_deref(), Some("nine"));
    }
}
