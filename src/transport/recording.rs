//! In-memory transport used by tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use futures::future::{BoxFuture, FutureExt};

use super::{ChatId, ChatTransport, OutgoingMessage, TransportError};

/// Records every attempted send; destinations marked unreachable fail.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingTransport {
    attempts: Arc<Mutex<Vec<OutgoingMessage>>>,
    unreachable: Arc<Mutex<HashSet<ChatId>>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn make_unreachable(&self, chat_id: ChatId) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    /// Every send attempt so far, including failed ones.
    pub(crate) fn attempts(&self) -> Vec<OutgoingMessage> {
        self.attempts.lock().unwrap().clone()
    }

    /// Attempts addressed to `chat_id`.
    pub(crate) fn sent_to(&self, chat_id: ChatId) -> Vec<OutgoingMessage> {
        self.attempts()
            .into_iter()
            .filter(|message| message.chat_id == chat_id)
            .collect()
    }

    /// Text of the latest attempt addressed to `chat_id`.
    pub(crate) fn last_text_to(&self, chat_id: ChatId) -> Option<String> {
        self.sent_to(chat_id).pop().map(|message| message.text)
    }

    pub(crate) fn clear(&self) {
        self.attempts.lock().unwrap().clear();
    }
}

impl ChatTransport for RecordingTransport {
    fn send(&self, message: OutgoingMessage) -> BoxFuture<'static, Result<(), TransportError>> {
        let chat_id = message.chat_id;
        let unreachable = self.unreachable.lock().unwrap().contains(&chat_id);
        self.attempts.lock().unwrap().push(message);

        async move {
            if unreachable {
                Err(TransportError::Delivery {
                    chat_id,
                    reason: "bot was blocked by the user".into(),
                })
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}
