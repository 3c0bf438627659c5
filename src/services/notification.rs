//! Best-effort fanout of system messages.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    state::{confirmation::PromptState, roster::Player},
    transport::{ChatId, ChatTransport, OutgoingMessage, TransportError},
};

/// Upper bound for a single delivery attempt.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// How announcements addressed to "everyone on the roster" are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// One direct message per registered player.
    #[default]
    DirectMessages,
    /// A single message to the configured group chat.
    GroupChannel,
}

impl FromStr for NotifyPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "direct" | "dm" | "players" => Ok(NotifyPolicy::DirectMessages),
            "group" | "channel" => Ok(NotifyPolicy::GroupChannel),
            other => Err(format!("unknown policy `{other}`, expected `direct` or `group`")),
        }
    }
}

impl fmt::Display for NotifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyPolicy::DirectMessages => f.write_str("direct"),
            NotifyPolicy::GroupChannel => f.write_str("group"),
        }
    }
}

/// Who an announcement is meant for, before the policy picks concrete destinations.
#[derive(Debug, Clone, Copy)]
pub enum Audience<'a> {
    /// Everyone in the given roster snapshot.
    Roster(&'a [Player]),
    /// The administrator destination.
    Admin,
    /// The group chat, if configured.
    Group,
}

/// Outcome of a fanout, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Destinations a send was attempted for.
    pub attempted: usize,
    /// Destinations that accepted the message.
    pub delivered: usize,
}

impl DeliveryReport {
    /// Destinations that could not be reached.
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Delivers notifications through the chat transport, one destination at a time
/// failing in isolation.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn ChatTransport>,
    policy: NotifyPolicy,
    admin: ChatId,
    group: Option<ChatId>,
}

impl Notifier {
    /// Build a notifier using the destinations and policy from `config`.
    pub fn new(transport: Arc<dyn ChatTransport>, config: &AppConfig) -> Self {
        Self {
            transport,
            policy: config.notify_policy,
            admin: config.admin_chat_id,
            group: config.group_chat_id,
        }
    }

    /// Resolve audiences into unique destinations, keeping first-seen order.
    pub fn destinations(&self, audiences: &[Audience<'_>]) -> Vec<ChatId> {
        let mut destinations = Vec::new();
        let mut push = |id: ChatId| {
            if !destinations.contains(&id) {
                destinations.push(id);
            }
        };

        for audience in audiences {
            match audience {
                Audience::Roster(players) => match (self.policy, self.group) {
                    (NotifyPolicy::GroupChannel, Some(group)) => push(group),
                    _ => players.iter().for_each(|player| push(player.id)),
                },
                Audience::Admin => push(self.admin),
                Audience::Group => match self.group {
                    Some(group) => push(group),
                    None => debug!("no group chat configured; skipping group audience"),
                },
            }
        }

        destinations
    }

    /// Resolve `audiences` and fan `text` out to them.
    pub async fn announce(&self, audiences: &[Audience<'_>], text: &str) -> DeliveryReport {
        let destinations = self.destinations(audiences);
        self.broadcast(&destinations, text).await
    }

    /// Attempt delivery of `text` to every destination independently.
    ///
    /// Failures are logged and skipped; the call always completes.
    pub async fn broadcast(&self, destinations: &[ChatId], text: &str) -> DeliveryReport {
        let attempts = destinations.iter().map(|&chat_id| {
            let message = OutgoingMessage::text(chat_id, text);
            async move { self.deliver(message).await.is_ok() }
        });
        let delivered = join_all(attempts)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count();

        let report = DeliveryReport {
            attempted: destinations.len(),
            delivered,
        };
        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed(),
                "broadcast finished"
            );
        }
        report
    }

    /// Send a direct reply carrying a keyboard hint. Failures are logged only.
    pub async fn reply(&self, chat_id: ChatId, text: impl Into<String>, prompt: PromptState) {
        let _ = self
            .deliver(OutgoingMessage::with_prompt(chat_id, text, prompt))
            .await;
    }

    async fn deliver(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        let chat_id = message.chat_id;
        let result = match timeout(SEND_TIMEOUT, self.transport.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout { chat_id }),
        };
        if let Err(err) = &result {
            warn!(chat_id, error = %err, "notification delivery failed");
        }
        result
    }
}
