use std::collections::HashSet;

use crate::state::roster::{PlayerId, RosterError};

/// Keyboard the transport should show alongside a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptState {
    /// Main menu: register, unregister, list.
    #[default]
    None,
    /// Yes/no keyboard for a pending registration.
    AwaitingRegistrationConfirmation,
    /// Yes/no keyboard for the organizer's "did the game happen?" question.
    AwaitingOrganizerConfirmation,
}

/// Pending yes/no questions: registration intents per participant plus the
/// organizer's one-shot question.
///
/// This type only tracks who owes an answer. Whether an intent may be opened at
/// all is decided by the roster, under the same lock.
#[derive(Debug, Default, Clone)]
pub struct ConfirmationFlow {
    pending: HashSet<PlayerId>,
    organizer_armed: bool,
}

impl ConfirmationFlow {
    /// Create a flow with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle -> AwaitingConfirmation` for `id`. Repeating the intent keeps it pending.
    pub fn begin(&mut self, id: PlayerId) {
        self.pending.insert(id);
    }

    /// `AwaitingConfirmation -> Idle` for `id`, whatever the answer was.
    pub fn resolve(&mut self, id: PlayerId) -> Result<(), RosterError> {
        if self.pending.remove(&id) {
            Ok(())
        } else {
            Err(RosterError::NothingPending)
        }
    }

    /// Whether `id` owes a registration answer.
    pub fn is_pending(&self, id: PlayerId) -> bool {
        self.pending.contains(&id)
    }

    /// Number of open registration intents.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Arm the organizer question. Re-arming an armed question is a no-op.
    pub fn arm_organizer(&mut self) {
        self.organizer_armed = true;
    }

    /// Whether the organizer owes an answer.
    pub fn organizer_armed(&self) -> bool {
        self.organizer_armed
    }

    /// Consume the organizer question.
    pub fn resolve_organizer(&mut self) -> Result<(), RosterError> {
        if std::mem::take(&mut self.organizer_armed) {
            Ok(())
        } else {
            Err(RosterError::NothingPending)
        }
    }

    /// Keyboard to show `id` given what they currently owe.
    pub fn prompt_for(&self, id: PlayerId, is_organizer: bool) -> PromptState {
        if is_organizer && self.organizer_armed {
            PromptState::AwaitingOrganizerConfirmation
        } else if self.is_pending(id) {
            PromptState::AwaitingRegistrationConfirmation
        } else {
            PromptState::None
        }
    }
}
