//! Runtime configuration read from the process environment.

use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::info;

use crate::{
    services::notification::NotifyPolicy, state::roster::DEFAULT_MAX_PLAYERS,
    transport::ChatId,
};

const DEFAULT_DATA_DIR: &str = "/app/data";
const DEFAULT_GAME_DAY: &str = "Sunday";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_CATCH_UP_MINUTES: u64 = 10;
const DEFAULT_HTTP_PORT: u16 = 8080;
/// Polling slower than once a minute could step over a whole trigger minute.
const MAX_POLL_INTERVAL_SECS: u64 = 60;
/// Must stay below the shortest gap between weekly triggers (Sunday 17:00 to 20:00).
const MAX_CATCH_UP_MINUTES: u64 = 120;

/// Failures that abort startup before anything is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or blank.
    #[error("missing required environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// A variable is present but cannot be used.
    #[error("invalid value for `{var}`: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Immutable runtime configuration shared across the application.
#[derive(Clone)]
pub struct AppConfig {
    /// Chat transport credential.
    pub bot_token: String,
    /// Destination receiving administrative notices.
    pub admin_chat_id: ChatId,
    /// Group chat used for announcements, when configured.
    pub group_chat_id: Option<ChatId>,
    /// Participant asked whether the game took place, when configured.
    pub organizer_chat_id: Option<ChatId>,
    /// Text appended to payment reminders.
    pub payment_info: Option<String>,
    /// How roster-wide announcements are delivered.
    pub notify_policy: NotifyPolicy,
    /// Directory holding the persisted roster and scheduler state.
    pub data_dir: PathBuf,
    /// Roster capacity.
    pub max_players: usize,
    /// Human label of the game day used in prompts.
    pub game_day: String,
    /// Scheduler polling resolution.
    pub poll_interval: Duration,
    /// How far back a missed trigger occurrence is still fired.
    pub catch_up: Duration,
    /// Port of the status HTTP surface.
    pub http_port: u16,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &"<redacted>")
            .field("admin_chat_id", &self.admin_chat_id)
            .field("group_chat_id", &self.group_chat_id)
            .field("organizer_chat_id", &self.organizer_chat_id)
            .field("payment_info", &self.payment_info)
            .field("notify_policy", &self.notify_policy)
            .field("data_dir", &self.data_dir)
            .field("max_players", &self.max_players)
            .field("game_day", &self.game_day)
            .field("poll_interval", &self.poll_interval)
            .field("catch_up", &self.catch_up)
            .field("http_port", &self.http_port)
            .finish()
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            data_dir = %config.data_dir.display(),
            max_players = config.max_players,
            policy = %config.notify_policy,
            group = config.group_chat_id.is_some(),
            organizer = config.organizer_chat_id.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::MissingEnvVar {
            var: "TELEGRAM_BOT_TOKEN",
        })?;
        let admin_chat_id = parse_var::<ChatId>("ADMIN_CHAT_ID", get("ADMIN_CHAT_ID"))?.ok_or(
            ConfigError::MissingEnvVar {
                var: "ADMIN_CHAT_ID",
            },
        )?;
        let group_chat_id = parse_var::<ChatId>("GROUP_CHAT_ID", get("GROUP_CHAT_ID"))?;
        let organizer_chat_id =
            parse_var::<ChatId>("ORGANIZER_CHAT_ID", get("ORGANIZER_CHAT_ID"))?;
        let notify_policy = parse_var::<NotifyPolicy>("NOTIFY_POLICY", get("NOTIFY_POLICY"))?
            .unwrap_or_default();

        if notify_policy == NotifyPolicy::GroupChannel && group_chat_id.is_none() {
            return Err(ConfigError::MissingEnvVar {
                var: "GROUP_CHAT_ID",
            });
        }

        let max_players = parse_var::<usize>("MAX_PLAYERS", get("MAX_PLAYERS"))?
            .unwrap_or(DEFAULT_MAX_PLAYERS);
        if max_players == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MAX_PLAYERS",
                reason: "capacity must be at least 1".into(),
            });
        }

        let poll_secs = parse_var::<u64>("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"))?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if !(1..=MAX_POLL_INTERVAL_SECS).contains(&poll_secs) {
            return Err(ConfigError::InvalidValue {
                var: "POLL_INTERVAL_SECS",
                reason: format!("must be between 1 and {MAX_POLL_INTERVAL_SECS} seconds"),
            });
        }

        let catch_up_minutes = parse_var::<u64>("CATCH_UP_MINUTES", get("CATCH_UP_MINUTES"))?
            .unwrap_or(DEFAULT_CATCH_UP_MINUTES);
        if !(1..=MAX_CATCH_UP_MINUTES).contains(&catch_up_minutes) {
            return Err(ConfigError::InvalidValue {
                var: "CATCH_UP_MINUTES",
                reason: format!("must be between 1 and {MAX_CATCH_UP_MINUTES} minutes"),
            });
        }

        let http_port = match parse_var::<u16>("HTTP_PORT", get("HTTP_PORT"))? {
            Some(port) => port,
            None => parse_var::<u16>("PORT", get("PORT"))?.unwrap_or(DEFAULT_HTTP_PORT),
        };

        Ok(Self {
            bot_token,
            admin_chat_id,
            group_chat_id,
            organizer_chat_id,
            payment_info: get("PAYMENT_INFO"),
            notify_policy,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            max_players,
            game_day: get("GAME_DAY").unwrap_or_else(|| DEFAULT_GAME_DAY.to_string()),
            poll_interval: Duration::from_secs(poll_secs),
            catch_up: Duration::from_secs(catch_up_minutes * 60),
            http_port,
        })
    }

    /// Whether `id` is the configured organizer.
    pub fn is_organizer(&self, id: ChatId) -> bool {
        self.organizer_chat_id == Some(id)
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
                var,
                reason: format!("`{raw}`: {err}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn minimal_configuration_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "-100"),
        ]))
        .unwrap();

        assert_eq!(config.admin_chat_id, -100);
        assert_eq!(config.max_players, DEFAULT_MAX_PLAYERS);
        assert_eq!(config.notify_policy, NotifyPolicy::DirectMessages);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.group_chat_id.is_none());
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("ADMIN_CHAT_ID", "1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar {
                var: "TELEGRAM_BOT_TOKEN"
            }
        ));
    }

    #[test]
    fn blank_admin_is_missing() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar {
                var: "ADMIN_CHAT_ID"
            }
        ));
    }

    #[test]
    fn group_policy_requires_group_chat() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "1"),
            ("NOTIFY_POLICY", "group"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar {
                var: "GROUP_CHAT_ID"
            }
        ));
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "admin"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "ADMIN_CHAT_ID",
                ..
            }
        ));
    }

    #[test]
    fn slow_polling_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "1"),
            ("POLL_INTERVAL_SECS", "90"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "POLL_INTERVAL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "super-secret"),
            ("ADMIN_CHAT_ID", "1"),
        ]))
        .unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn catch_up_is_bounded() {
        for value in ["0", "121", "10080", "18446744073709551615"] {
            let err = AppConfig::from_lookup(lookup(&[
                ("TELEGRAM_BOT_TOKEN", "token"),
                ("ADMIN_CHAT_ID", "1"),
                ("CATCH_UP_MINUTES", value),
            ]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    var: "CATCH_UP_MINUTES",
                    ..
                }
            ));
        }

        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "1"),
            ("CATCH_UP_MINUTES", "120"),
        ]))
        .unwrap();
        assert_eq!(config.catch_up, Duration::from_secs(120 * 60));
    }
}
