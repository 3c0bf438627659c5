/// Pending confirmations and the organizer question.
pub mod confirmation;
/// Players and the capacity-bounded roster.
pub mod roster;
/// Registration window.
pub mod window;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{
        models::{OrganizerPromptEntity, WindowEntity},
        roster::RosterRepository,
        schedule::{OrganizerPromptRepository, WindowRepository},
        storage::{StorageError, StorageResult},
    },
    services::notification::Notifier,
    transport::ChatTransport,
};

use self::{
    confirmation::{ConfirmationFlow, PromptState},
    roster::{Player, PlayerId, Roster, RosterError},
    window::RegistrationWindow,
};

/// Handle shared by the dispatcher, scheduler and routes.
pub type SharedState = Arc<AppState>;

/// Everything guarded by the single roster lock.
///
/// Capacity checks, pending-set bookkeeping and window flips all happen while
/// holding this lock so check-then-act sequences cannot interleave.
#[derive(Debug)]
struct RosterDomain {
    roster: Roster,
    window: RegistrationWindow,
    confirmations: ConfirmationFlow,
}

/// Read-only copy of the roster domain.
#[derive(Debug, Clone)]
pub struct RosterStatus {
    /// Registered players in order.
    pub players: Vec<Player>,
    /// Roster capacity.
    pub capacity: usize,
    /// Current registration window.
    pub window: RegistrationWindow,
    /// Number of registration intents awaiting an answer.
    pub pending: usize,
    /// Whether the organizer question is armed.
    pub organizer_armed: bool,
}

/// Central application state: the roster domain, its persistence, and the
/// notification sink shared by the chat handlers and the scheduler.
pub struct AppState {
    config: AppConfig,
    domain: Mutex<RosterDomain>,
    roster_repository: RosterRepository,
    window_repository: WindowRepository,
    organizer_repository: OrganizerPromptRepository,
    notifier: Notifier,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Restore persisted state from the configured data directory.
    ///
    /// Missing files are a first run: empty roster and an open window.
    pub async fn load(
        config: AppConfig,
        transport: Arc<dyn ChatTransport>,
    ) -> StorageResult<SharedState> {
        let roster_repository = RosterRepository::in_dir(&config.data_dir);
        let window_repository = WindowRepository::in_dir(&config.data_dir);
        let organizer_repository = OrganizerPromptRepository::in_dir(&config.data_dir);

        let players = roster_repository.load().await?;
        let persisted_count = players.len();
        let roster = Roster::from_players(config.max_players, players);
        if roster.len() != persisted_count {
            warn!(
                persisted = persisted_count,
                kept = roster.len(),
                capacity = roster.capacity(),
                "persisted roster had duplicates or exceeded capacity; extra entries dropped"
            );
        }

        let window = window_repository
            .load()
            .await?
            .map(RegistrationWindow::from)
            .unwrap_or_default();

        let mut confirmations = ConfirmationFlow::new();
        if organizer_repository.load().await?.armed {
            confirmations.arm_organizer();
        }

        info!(
            players = roster.len(),
            capacity = roster.capacity(),
            window_open = window.is_open(),
            organizer_armed = confirmations.organizer_armed(),
            "roster state restored"
        );

        let notifier = Notifier::new(transport, &config);
        let (degraded_tx, _rx) = watch::channel(false);

        Ok(Arc::new(Self {
            config,
            domain: Mutex::new(RosterDomain {
                roster,
                window,
                confirmations,
            }),
            roster_repository,
            window_repository,
            organizer_repository,
            notifier,
            degraded: degraded_tx,
        }))
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Notification sink.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Whether the last persistence attempt failed.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Append `player` to the roster.
    ///
    /// Fails with `RegistrationClosed`, `AlreadyRegistered` or `Full` without
    /// touching the roster; on success the new roster is on disk before this returns.
    pub async fn register(&self, player: Player) -> Result<(), RosterError> {
        let mut domain = self.domain.lock().await;
        self.register_locked(&mut domain, player).await
    }

    /// Remove `id` from the roster, returning the removed player.
    pub async fn unregister(&self, id: PlayerId) -> Result<Player, RosterError> {
        let mut domain = self.domain.lock().await;
        let mut next = domain.roster.clone();
        let removed = next.remove(id)?;
        self.persist_roster(&next).await?;
        domain.roster = next;
        info!(player_id = id, remaining = domain.roster.len(), "player unregistered");
        Ok(removed)
    }

    /// Snapshot of the registered players in registration order.
    pub async fn list(&self) -> Vec<Player> {
        self.domain.lock().await.roster.snapshot()
    }

    /// Empty the roster, returning who was on it.
    pub async fn clear(&self) -> Result<Vec<Player>, RosterError> {
        let mut domain = self.domain.lock().await;
        let removed = domain.roster.snapshot();
        let mut next = domain.roster.clone();
        next.clear();
        self.persist_roster(&next).await?;
        domain.roster = next;
        info!(cleared = removed.len(), "roster cleared");
        Ok(removed)
    }

    /// Open or close the registration window, recording `reason`.
    pub async fn set_window(
        &self,
        open: bool,
        reason: &str,
    ) -> Result<RegistrationWindow, RosterError> {
        let mut domain = self.domain.lock().await;
        let next = domain.window.transitioned(open, reason, Utc::now());
        let result = self
            .window_repository
            .save(&WindowEntity::from(&next))
            .await;
        self.track_storage(&result);
        result?;
        domain.window = next.clone();
        info!(open, reason, epoch = next.epoch(), "registration window updated");
        Ok(next)
    }

    /// Current registration window.
    pub async fn window(&self) -> RegistrationWindow {
        self.domain.lock().await.window.clone()
    }

    /// Open a registration intent for `player`.
    ///
    /// Rejected in place with the roster's reason when the window is closed, the
    /// player is already registered, or the roster is full.
    pub async fn request_registration(&self, player: &Player) -> Result<(), RosterError> {
        let mut domain = self.domain.lock().await;
        let window_open = domain.window.is_open();
        domain.roster.admissible(player.id, window_open)?;
        domain.confirmations.begin(player.id);
        Ok(())
    }

    /// Answer "yes" to a pending intent and register the player.
    ///
    /// The intent is consumed even when registration then fails, e.g. because a
    /// racing participant took the last slot in between.
    pub async fn confirm_registration(&self, player: Player) -> Result<(), RosterError> {
        let mut domain = self.domain.lock().await;
        domain.confirmations.resolve(player.id)?;
        self.register_locked(&mut domain, player).await
    }

    /// Answer "no" to a pending intent.
    pub async fn cancel_registration(&self, id: PlayerId) -> Result<(), RosterError> {
        self.domain.lock().await.confirmations.resolve(id)
    }

    /// Arm the organizer's "did the game happen?" question.
    ///
    /// The armed flag is durable so an answer after a restart still counts.
    pub async fn arm_organizer(&self) -> Result<(), RosterError> {
        let mut domain = self.domain.lock().await;
        self.persist_organizer(true).await?;
        domain.confirmations.arm_organizer();
        info!("organizer question armed");
        Ok(())
    }

    /// Whether the organizer question is armed.
    pub async fn organizer_armed(&self) -> bool {
        self.domain.lock().await.confirmations.organizer_armed()
    }

    /// Consume the organizer question.
    pub async fn resolve_organizer(&self) -> Result<(), RosterError> {
        let mut domain = self.domain.lock().await;
        if !domain.confirmations.organizer_armed() {
            return Err(RosterError::NothingPending);
        }
        self.persist_organizer(false).await?;
        domain.confirmations.resolve_organizer()
    }

    /// Keyboard `id` should currently see.
    pub async fn prompt_for(&self, id: PlayerId) -> PromptState {
        let is_organizer = self.config.is_organizer(id);
        self.domain
            .lock()
            .await
            .confirmations
            .prompt_for(id, is_organizer)
    }

    /// Consistent snapshot of the whole roster domain.
    pub async fn status(&self) -> RosterStatus {
        let domain = self.domain.lock().await;
        RosterStatus {
            players: domain.roster.snapshot(),
            capacity: domain.roster.capacity(),
            window: domain.window.clone(),
            pending: domain.confirmations.pending_count(),
            organizer_armed: domain.confirmations.organizer_armed(),
        }
    }

    async fn register_locked(
        &self,
        domain: &mut RosterDomain,
        player: Player,
    ) -> Result<(), RosterError> {
        let player_id = player.id;
        let mut next = domain.roster.clone();
        next.add(player, domain.window.is_open())?;
        self.persist_roster(&next).await?;
        domain.roster = next;
        // A registered player never keeps a pending intent.
        domain.confirmations.resolve(player_id).ok();
        info!(
            player_id,
            registered = domain.roster.len(),
            capacity = domain.roster.capacity(),
            "player registered"
        );
        Ok(())
    }

    async fn persist_roster(&self, roster: &Roster) -> Result<(), StorageError> {
        let result = self.roster_repository.save(&roster.snapshot()).await;
        self.track_storage(&result);
        result
    }

    async fn persist_organizer(&self, armed: bool) -> Result<(), StorageError> {
        let prompt = OrganizerPromptEntity {
            armed,
            asked_at: armed.then(Utc::now),
        };
        let result = self.organizer_repository.save(&prompt).await;
        self.track_storage(&result);
        result
    }

    fn track_storage(&self, result: &Result<(), StorageError>) {
        let failed = result.is_err();
        if let Err(err) = result {
            warn!(error = %err, "persisting roster state failed; change not applied");
        }
        self.degraded.send_if_modified(|degraded| {
            let changed = *degraded != failed;
            *degraded = failed;
            changed
        });
    }
}
