/// Weekly trigger table and de-duplication.
pub mod triggers;

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    dao::{schedule::TriggerLedgerRepository, storage::StorageResult},
    services::{notification::Audience, texts},
    state::{
        SharedState,
        confirmation::PromptState,
        roster::{Player, RosterError},
    },
    transport::ChatId,
};

use self::triggers::{TriggerKind, TriggerTable};

/// Polls the wall clock and runs weekly triggers against the shared state.
pub struct Scheduler {
    state: SharedState,
    table: TriggerTable,
    ledger_repository: TriggerLedgerRepository,
    poll_interval: Duration,
    cleared_unannounced: Option<Vec<Player>>,
}

/// Notifications owed once a trigger's state change is durable.
#[derive(Debug)]
enum FollowUp {
    Nothing,
    Group(&'static str),
    Roster { players: Vec<Player>, text: String },
    Organizer(ChatId),
}

impl Scheduler {
    /// Build the weekly table and restore which occurrences already ran.
    pub async fn load(state: SharedState) -> StorageResult<Self> {
        let config = state.config();
        let ledger_repository = TriggerLedgerRepository::in_dir(&config.data_dir);
        let mut table = TriggerTable::weekly(config.catch_up);
        table.restore(&ledger_repository.load().await?);
        let poll_interval = config.poll_interval;

        for trigger in table.triggers() {
            let schedule = trigger.schedule();
            debug!(
                trigger = %trigger.kind(),
                weekday = %schedule.weekday(),
                hour = schedule.hour(),
                minute = schedule.minute(),
                last_fired = ?trigger.last_fired(),
                "trigger scheduled"
            );
        }

        Ok(Self {
            state,
            table,
            ledger_repository,
            poll_interval,
            cleared_unannounced: None,
        })
    }

    /// Run every trigger due at `now`, returning those that completed.
    ///
    /// For each trigger the state change is applied, the occurrence is recorded
    /// in the ledger on disk, and only then are notifications sent, so a restart
    /// mid-fanout never repeats an occurrence. A trigger whose state change fails
    /// is left unmarked and retried on the next tick while its occurrence is
    /// still inside the catch-up window.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Vec<TriggerKind> {
        let mut fired = Vec::new();
        for due in self.table.due(now) {
            info!(trigger = %due.kind, occurrence = %due.occurrence, "running scheduled trigger");
            let follow_up = match self.apply(due.kind).await {
                Ok(follow_up) => follow_up,
                Err(err) => {
                    warn!(trigger = %due.kind, error = %err, "scheduled trigger failed; will retry");
                    continue;
                }
            };

            self.table.mark_fired(due.kind, due.occurrence);
            if let Err(err) = self.ledger_repository.save(&self.table.ledger()).await {
                warn!(
                    trigger = %due.kind,
                    error = %err,
                    "persisting trigger ledger failed; a restart may repeat this occurrence"
                );
            }

            self.notify(follow_up).await;
            fired.push(due.kind);
        }
        fired
    }

    /// Apply the state change behind `kind` and return what still has to be sent.
    async fn apply(&mut self, kind: TriggerKind) -> Result<FollowUp, RosterError> {
        let follow_up = match kind {
            TriggerKind::OpenRegistration => {
                self.state.set_window(true, kind.as_str()).await?;
                FollowUp::Group(texts::REGISTRATION_OPEN)
            }
            TriggerKind::AskOrganizer => {
                let Some(organizer) = self.state.config().organizer_chat_id else {
                    info!("no organizer configured; skipping organizer question");
                    return Ok(FollowUp::Nothing);
                };
                self.state.arm_organizer().await?;
                FollowUp::Organizer(organizer)
            }
            TriggerKind::CloseAndRemind => {
                self.state.set_window(false, kind.as_str()).await?;
                FollowUp::Roster {
                    players: self.state.list().await,
                    text: texts::payment_reminder(self.state.config().payment_info.as_deref()),
                }
            }
            TriggerKind::ClearRoster => {
                let mut cleared = self.cleared_unannounced.take().unwrap_or_default();
                cleared.extend(self.state.clear().await?);
                if let Err(err) = self.state.set_window(true, kind.as_str()).await {
                    // Keep who was cleared so the retry still tells them.
                    self.cleared_unannounced = Some(cleared);
                    return Err(err);
                }
                FollowUp::Roster {
                    players: cleared,
                    text: texts::GAME_CONCLUDED.to_string(),
                }
            }
        };
        Ok(follow_up)
    }

    async fn notify(&self, follow_up: FollowUp) {
        let notifier = self.state.notifier();
        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::Group(text) => {
                notifier.announce(&[Audience::Group], text).await;
            }
            FollowUp::Roster { players, text } => {
                notifier.announce(&[Audience::Roster(&players)], &text).await;
            }
            FollowUp::Organizer(organizer) => {
                notifier
                    .reply(
                        organizer,
                        texts::ORGANIZER_QUESTION,
                        PromptState::AwaitingOrganizerConfirmation,
                    )
                    .await;
            }
        }
    }

    /// Poll the clock until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_interval = ?self.poll_interval, "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Local::now().naive_local()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use chrono::NaiveDate;
    use futures::future::{BoxFuture, FutureExt};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        state::AppState,
        test_support::{GROUP_CHAT_ID, ORGANIZER_CHAT_ID, test_config},
        transport::{ChatTransport, OutgoingMessage, TransportError, recording::RecordingTransport},
    };

    /// Records, for every send, whether `triggers.json` already held the reminder.
    #[derive(Clone)]
    struct LedgerAtSend {
        ledger_path: PathBuf,
        seen: Arc<Mutex<Vec<bool>>>,
    }

    impl ChatTransport for LedgerAtSend {
        fn send(&self, _message: OutgoingMessage) -> BoxFuture<'static, Result<(), TransportError>> {
            let recorded = std::fs::read_to_string(&self.ledger_path)
                .map(|ledger| ledger.contains(TriggerKind::CloseAndRemind.as_str()))
                .unwrap_or(false);
            self.seen.lock().unwrap().push(recorded);
            async { Ok(()) }.boxed()
        }
    }

    /// 2026-10-12 is a Monday.
    fn at(day_offset: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 12 + day_offset)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    const SATURDAY: u32 = 5;
    const SUNDAY: u32 = 6;

    fn player(id: i64) -> Player {
        Player {
            id,
            first_name: format!("P{id}"),
            last_name: None,
            handle: None,
        }
    }

    async fn setup(dir: &TempDir) -> (SharedState, RecordingTransport, Scheduler) {
        let transport = RecordingTransport::new();
        let mut config = test_config(dir.path());
        config.catch_up = Duration::from_secs(60);
        let state = AppState::load(config, Arc::new(transport.clone()))
            .await
            .unwrap();
        let scheduler = Scheduler::load(state.clone()).await.unwrap();
        (state, transport, scheduler)
    }

    #[tokio::test]
    async fn saturday_close_sends_one_reminder_per_player() {
        let dir = TempDir::new().unwrap();
        let (state, transport, mut scheduler) = setup(&dir).await;
        state.register(player(1)).await.unwrap();
        state.register(player(2)).await.unwrap();

        assert!(scheduler.tick(at(SATURDAY, 10, 59)).await.is_empty());
        assert!(state.window().await.is_open());

        assert_eq!(
            scheduler.tick(at(SATURDAY, 11, 0)).await,
            vec![TriggerKind::CloseAndRemind]
        );
        assert!(!state.window().await.is_open());
        assert_eq!(transport.attempts().len(), 2);
        assert!(
            transport
                .last_text_to(1)
                .unwrap()
                .contains("Transfer 500 to the club card")
        );

        assert!(scheduler.tick(at(SATURDAY, 11, 0)).await.is_empty());
        assert!(scheduler.tick(at(SATURDAY, 11, 1)).await.is_empty());
        assert_eq!(transport.attempts().len(), 2);
        assert_eq!(state.window().await.epoch(), 1);
    }

    #[tokio::test]
    async fn sunday_clear_notifies_empties_and_reopens() {
        let dir = TempDir::new().unwrap();
        let (state, transport, mut scheduler) = setup(&dir).await;
        state.register(player(1)).await.unwrap();
        state.register(player(2)).await.unwrap();
        state.set_window(false, "test").await.unwrap();

        scheduler.tick(at(SUNDAY, 20, 0)).await;

        assert!(state.list().await.is_empty());
        assert!(state.window().await.is_open());
        assert_eq!(
            transport.last_text_to(1).as_deref(),
            Some(texts::GAME_CONCLUDED)
        );
        assert_eq!(
            transport.last_text_to(2).as_deref(),
            Some(texts::GAME_CONCLUDED)
        );
    }

    #[tokio::test]
    async fn monday_opens_registration_and_announces_to_group() {
        let dir = TempDir::new().unwrap();
        let (state, transport, mut scheduler) = setup(&dir).await;
        state.set_window(false, "test").await.unwrap();

        assert_eq!(
            scheduler.tick(at(0, 12, 0)).await,
            vec![TriggerKind::OpenRegistration]
        );
        assert!(state.window().await.is_open());
        assert_eq!(
            transport.last_text_to(GROUP_CHAT_ID).as_deref(),
            Some(texts::REGISTRATION_OPEN)
        );
    }

    #[tokio::test]
    async fn organizer_question_arms_and_prompts() {
        let dir = TempDir::new().unwrap();
        let (state, transport, mut scheduler) = setup(&dir).await;

        scheduler.tick(at(SUNDAY, 17, 0)).await;

        assert!(state.organizer_armed().await);
        let sent = transport.sent_to(ORGANIZER_CHAT_ID);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, texts::ORGANIZER_QUESTION);
        assert_eq!(
            sent[0].keyboard,
            Some(PromptState::AwaitingOrganizerConfirmation)
        );
        assert_eq!(
            state.prompt_for(ORGANIZER_CHAT_ID).await,
            PromptState::AwaitingOrganizerConfirmation
        );
    }

    #[tokio::test]
    async fn organizer_question_skipped_without_organizer() {
        let dir = TempDir::new().unwrap();
        let transport = RecordingTransport::new();
        let mut config = test_config(dir.path());
        config.organizer_chat_id = None;
        let state = AppState::load(config, Arc::new(transport.clone()))
            .await
            .unwrap();
        let mut scheduler = Scheduler::load(state.clone()).await.unwrap();

        assert_eq!(
            scheduler.tick(at(SUNDAY, 17, 0)).await,
            vec![TriggerKind::AskOrganizer]
        );
        assert!(!state.organizer_armed().await);
        assert!(transport.attempts().is_empty());
    }

    #[tokio::test]
    async fn ledger_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let (_state, _transport, mut scheduler) = setup(&dir).await;
            scheduler.tick(at(SATURDAY, 11, 0)).await;
        }

        let (_state, transport, mut scheduler) = setup(&dir).await;
        assert!(scheduler.tick(at(SATURDAY, 11, 0)).await.is_empty());
        assert!(transport.attempts().is_empty());
    }

    #[tokio::test]
    async fn failed_trigger_is_retried() {
        let dir = TempDir::new().unwrap();
        let (state, _transport, mut scheduler) = setup(&dir).await;
        std::fs::create_dir(dir.path().join("window.json")).unwrap();

        assert!(scheduler.tick(at(SATURDAY, 11, 0)).await.is_empty());
        assert!(state.window().await.is_open());
        assert!(state.is_degraded());

        std::fs::remove_dir(dir.path().join("window.json")).unwrap();
        assert_eq!(
            scheduler.tick(at(SATURDAY, 11, 0)).await,
            vec![TriggerKind::CloseAndRemind]
        );
        assert!(!state.window().await.is_open());
    }

    #[tokio::test]
    async fn occurrence_is_recorded_before_reminders_go_out() {
        let dir = TempDir::new().unwrap();
        let transport = LedgerAtSend {
            ledger_path: dir.path().join("triggers.json"),
            seen: Arc::default(),
        };
        let mut config = test_config(dir.path());
        config.catch_up = Duration::from_secs(60);
        let state = AppState::load(config, Arc::new(transport.clone()))
            .await
            .unwrap();
        state.register(player(1)).await.unwrap();
        state.register(player(2)).await.unwrap();
        let mut scheduler = Scheduler::load(state.clone()).await.unwrap();

        assert_eq!(
            scheduler.tick(at(SATURDAY, 11, 0)).await,
            vec![TriggerKind::CloseAndRemind]
        );
        assert_eq!(*transport.seen.lock().unwrap(), vec![true, true]);
    }

    #[tokio::test]
    async fn clear_retried_after_reopen_failure_still_notifies_cleared_players() {
        let dir = TempDir::new().unwrap();
        let (state, transport, mut scheduler) = setup(&dir).await;
        state.register(player(1)).await.unwrap();
        state.register(player(2)).await.unwrap();
        state.set_window(false, "test").await.unwrap();
        std::fs::remove_file(dir.path().join("window.json")).unwrap();
        std::fs::create_dir(dir.path().join("window.json")).unwrap();

        assert!(scheduler.tick(at(SUNDAY, 20, 0)).await.is_empty());
        assert!(state.list().await.is_empty());
        assert!(!state.window().await.is_open());
        assert!(transport.sent_to(1).is_empty());

        std::fs::remove_dir(dir.path().join("window.json")).unwrap();
        assert_eq!(
            scheduler.tick(at(SUNDAY, 20, 0)).await,
            vec![TriggerKind::ClearRoster]
        );
        assert!(state.window().await.is_open());
        assert_eq!(
            transport.last_text_to(1).as_deref(),
            Some(texts::GAME_CONCLUDED)
        );
        assert_eq!(
            transport.last_text_to(2).as_deref(),
            Some(texts::GAME_CONCLUDED)
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let (_state, _transport, scheduler) = setup(&dir).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
