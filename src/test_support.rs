//! Fixtures shared by unit tests across modules.

use std::{path::Path, time::Duration};

use crate::{config::AppConfig, services::notification::NotifyPolicy, transport::ChatId};

pub(crate) const ADMIN_CHAT_ID: ChatId = 1_000;
pub(crate) const GROUP_CHAT_ID: ChatId = -2_000;
pub(crate) const ORGANIZER_CHAT_ID: ChatId = 3_000;

/// Configuration with every destination set, storing data under `data_dir`.
pub(crate) fn test_config(data_dir: &Path) -> AppConfig {
    AppConfig {
        bot_token: "test-token".into(),
        admin_chat_id: ADMIN_CHAT_ID,
        group_chat_id: Some(GROUP_CHAT_ID),
        organizer_chat_id: Some(ORGANIZER_CHAT_ID),
        payment_info: Some("Transfer 500 to the club card".into()),
        notify_policy: NotifyPolicy::DirectMessages,
        data_dir: data_dir.to_path_buf(),
        max_players: 12,
        game_day: "Sunday".into(),
        poll_interval: Duration::from_secs(30),
        catch_up: Duration::from_secs(600),
        http_port: 0,
    }
}
