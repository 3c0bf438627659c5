//! Telegram Bot API transport: long polling for updates, `sendMessage` for delivery.

use std::{sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::sleep,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::{services::intent::Intent, state::confirmation::PromptState};

use super::{ChatId, ChatTransport, IncomingMessage, OutgoingMessage, Sender, TransportError};

const API_BASE: &str = "https://api.telegram.org";
/// Seconds the server may hold a `getUpdates` call open.
const LONG_POLL_SECS: u64 = 30;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(LONG_POLL_SECS + 15);
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bot API client shared by the poller and the notifier.
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    base_url: Arc<str>,
}

impl TelegramTransport {
    /// Build a client for the bot identified by `token`.
    pub fn new(token: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Setup(err.to_string()))?;
        Ok(Self {
            client,
            base_url: Arc::from(format!("{API_BASE}/bot{token}")),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, String>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await
            // Strip the URL so the bot token never reaches the logs.
            .map_err(|err| err.without_url().to_string())?;

        let status = response.status();
        let payload = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|err| format!("invalid {method} response ({status}): {}", err.without_url()))?;

        match payload {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(description
                .unwrap_or_else(|| format!("{method} failed with status {status}"))),
        }
    }

    /// Username of the bot behind the token.
    pub async fn get_me(&self) -> Result<Option<String>, TransportError> {
        let me: ApiUser = self
            .call("getMe", &serde_json::json!({}))
            .await
            .map_err(TransportError::Receive)?;
        Ok(me.username)
    }

    /// Long-poll for updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: LONG_POLL_SECS,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request)
            .await
            .map_err(TransportError::Receive)
    }

    /// Deliver one message, rendering its keyboard hint as a reply keyboard.
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id: message.chat_id,
            text: &message.text,
            reply_markup: message.keyboard.map(ReplyKeyboard::for_prompt),
        };
        self.call::<_, serde_json::Value>("sendMessage", &request)
            .await
            .map(|_| ())
            .map_err(|reason| TransportError::Delivery {
                chat_id: message.chat_id,
                reason,
            })
    }

    /// Spawn the long-polling loop.
    ///
    /// The loop exits when `shutdown` flips to `true` or the returned stream is
    /// dropped. Failed polls are retried after a short delay.
    pub fn start_polling(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> (JoinHandle<()>, UnboundedReceiverStream<IncomingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = self.clone();

        let handle = tokio::spawn(async move {
            info!("telegram polling started");
            let mut offset = 0;
            loop {
                let updates = tokio::select! {
                    result = transport.get_updates(offset) => result,
                    _ = shutdown.changed() => break,
                };

                match updates {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let Some(message) = update.into_incoming() else {
                                continue;
                            };
                            if tx.send(message).is_err() {
                                info!("update receiver dropped; stopping telegram polling");
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "telegram polling failed; retrying");
                        tokio::select! {
                            _ = sleep(RETRY_DELAY) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                }
            }
            info!("telegram polling stopped");
        });

        (handle, UnboundedReceiverStream::new(rx))
    }
}

impl ChatTransport for TelegramTransport {
    fn send(&self, message: OutgoingMessage) -> BoxFuture<'static, Result<(), TransportError>> {
        let transport = self.clone();
        async move {
            transport.send_message(&message).await?;
            debug!(chat_id = message.chat_id, "message delivered");
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboard>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboard {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: &'static str,
}

impl ReplyKeyboard {
    fn for_prompt(prompt: PromptState) -> Self {
        let layout = match prompt {
            PromptState::None => Intent::MAIN_KEYBOARD,
            PromptState::AwaitingRegistrationConfirmation
            | PromptState::AwaitingOrganizerConfirmation => Intent::CONFIRM_KEYBOARD,
        };
        let keyboard = layout
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|intent| intent.label())
                    .map(|text| KeyboardButton { text })
                    .collect()
            })
            .collect();
        Self {
            keyboard,
            resize_keyboard: true,
        }
    }
}

/// One entry of a `getUpdates` result.
#[derive(Debug, Deserialize)]
pub struct Update {
    update_id: i64,
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    chat: ApiChat,
    from: Option<ApiUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: ChatId,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
}

impl Update {
    /// Text message from a human sender, if this update carries one.
    fn into_incoming(self) -> Option<IncomingMessage> {
        let message = self.message?;
        let text = message.text?;
        let from = message.from.filter(|user| !user.is_bot)?;
        Some(IncomingMessage {
            chat_id: message.chat.id,
            sender: Sender {
                id: from.id,
                first_name: from.first_name,
                last_name: from.last_name,
                handle: from.username,
            },
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn update(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_update_becomes_incoming_message() {
        let incoming = update(json!({
            "update_id": 7,
            "message": {
                "message_id": 1,
                "date": 0,
                "chat": { "id": 42, "type": "private" },
                "from": { "id": 42, "is_bot": false, "first_name": "Anna", "username": "anna" },
                "text": "📥 Register"
            }
        }))
        .into_incoming()
        .unwrap();

        assert_eq!(incoming.chat_id, 42);
        assert_eq!(incoming.sender.first_name.as_deref(), Some("Anna"));
        assert_eq!(incoming.sender.last_name, None);
        assert_eq!(incoming.sender.handle.as_deref(), Some("anna"));
        assert_eq!(Intent::parse(&incoming.text), Intent::Register);
    }

    #[test]
    fn bot_and_non_text_updates_are_skipped() {
        let from_bot = update(json!({
            "update_id": 1,
            "message": {
                "chat": { "id": 5 },
                "from": { "id": 5, "is_bot": true, "first_name": "Bot" },
                "text": "hi"
            }
        }));
        let sticker = update(json!({
            "update_id": 2,
            "message": { "chat": { "id": 5 }, "from": { "id": 5, "first_name": "Ivan" } }
        }));
        let edited = update(json!({ "update_id": 3, "edited_message": {} }));

        assert!(from_bot.into_incoming().is_none());
        assert!(sticker.into_incoming().is_none());
        assert!(edited.into_incoming().is_none());
    }

    #[test]
    fn prompts_map_to_reply_keyboards() {
        let main = serde_json::to_value(ReplyKeyboard::for_prompt(PromptState::None)).unwrap();
        assert_eq!(
            main,
            json!({
                "keyboard": [
                    [{ "text": "📥 Register" }, { "text": "📤 Unregister" }],
                    [{ "text": "📋 Player list" }]
                ],
                "resize_keyboard": true
            })
        );

        let confirm = serde_json::to_value(ReplyKeyboard::for_prompt(
            PromptState::AwaitingOrganizerConfirmation,
        ))
        .unwrap();
        assert_eq!(
            confirm["keyboard"],
            json!([[{ "text": "✅ Yes" }, { "text": "❌ No" }]])
        );
    }

    #[test]
    fn plain_text_omits_reply_markup() {
        let request = SendMessageRequest {
            chat_id: 1,
            text: "hello",
            reply_markup: None,
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({ "chat_id": 1, "text": "hello" })
        );
    }
}
