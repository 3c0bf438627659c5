use indexmap::IndexMap;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Identifier assigned to a participant by the chat transport.
pub type PlayerId = i64;

/// Capacity used when the configuration does not override it.
pub const DEFAULT_MAX_PLAYERS: usize = 12;

/// A participant as known to the roster.
///
/// Two players are the same player when their ids match; names and handles are
/// display data only.
#[derive(Debug, Clone)]
pub struct Player {
    /// Transport identity, unique per participant.
    pub id: PlayerId,
    /// First name, always present for a registered player.
    pub first_name: String,
    /// Optional last name.
    pub last_name: Option<String>,
    /// Optional platform handle.
    pub handle: Option<String>,
}

impl Player {
    /// `"First Last"`, or just the first name.
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name.trim(), last),
            _ => self.first_name.trim().to_string(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

/// Conflicts and failures reported by roster and confirmation operations.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The registration window is closed.
    #[error("registration is closed")]
    RegistrationClosed,
    /// The participant is already on the roster.
    #[error("player is already registered")]
    AlreadyRegistered,
    /// Every slot is taken.
    #[error("roster is full ({capacity} players)")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },
    /// The participant is not on the roster.
    #[error("player is not registered")]
    NotRegistered,
    /// A yes/no answer arrived with nothing awaiting it.
    #[error("nothing is awaiting confirmation")]
    NothingPending,
    /// The change could not be made durable and was not applied.
    #[error("failed to persist roster change")]
    Storage(#[from] StorageError),
}

/// Ordered, capacity-bounded list of registered players keyed by id.
#[derive(Debug, Clone)]
pub struct Roster {
    players: IndexMap<PlayerId, Player>,
    capacity: usize,
}

impl Roster {
    /// Create an empty roster holding at most `capacity` players.
    pub fn new(capacity: usize) -> Self {
        Self {
            players: IndexMap::new(),
            capacity,
        }
    }

    /// Rebuild a roster from persisted players, keeping their order.
    ///
    /// Duplicate ids keep their first occurrence and entries past `capacity` are
    /// dropped so a hand-edited file cannot break the invariants.
    pub fn from_players(capacity: usize, players: impl IntoIterator<Item = Player>) -> Self {
        let mut roster = Self::new(capacity);
        for player in players {
            if roster.is_full() {
                break;
            }
            roster.players.entry(player.id).or_insert(player);
        }
        roster
    }

    /// Maximum number of players.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Check whether `id` could be added right now without adding it.
    ///
    /// The order of checks fixes which reason wins: closed, then duplicate, then full.
    pub fn admissible(&self, id: PlayerId, window_open: bool) -> Result<(), RosterError> {
        if !window_open {
            return Err(RosterError::RegistrationClosed);
        }
        if self.contains(id) {
            return Err(RosterError::AlreadyRegistered);
        }
        if self.is_full() {
            return Err(RosterError::Full {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Append `player` at the end if admissible.
    pub fn add(&mut self, player: Player, window_open: bool) -> Result<(), RosterError> {
        self.admissible(player.id, window_open)?;
        self.players.insert(player.id, player);
        Ok(())
    }

    /// Remove `id`, keeping the relative order of the remaining players.
    pub fn remove(&mut self, id: PlayerId) -> Result<Player, RosterError> {
        self.players
            .shift_remove(&id)
            .ok_or(RosterError::NotRegistered)
    }

    /// Drop every player.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Copy of the players in registration order.
    pub fn snapshot(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: PlayerId) -> Player {
        Player {
            id,
            first_name: format!("P{id}"),
            last_name: None,
            handle: None,
        }
    }

    #[test]
    fn players_are_listed_in_registration_order() {
        let mut roster = Roster::new(3);
        roster.add(player(30), true).unwrap();
        roster.add(player(10), true).unwrap();
        roster.add(player(20), true).unwrap();

        let ids: Vec<_> = roster.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn duplicate_registration_leaves_roster_unchanged() {
        let mut roster = Roster::new(3);
        roster.add(player(1), true).unwrap();

        let err = roster.add(player(1), true).unwrap_err();
        assert!(matches!(err, RosterError::AlreadyRegistered));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn full_roster_rejects_new_players() {
        let mut roster = Roster::new(1);
        roster.add(player(1), true).unwrap();

        let err = roster.add(player(2), true).unwrap_err();
        assert!(matches!(err, RosterError::Full { capacity: 1 }));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn closed_window_wins_over_other_reasons() {
        let mut roster = Roster::new(1);
        roster.add(player(1), true).unwrap();

        assert!(matches!(
            roster.admissible(1, false),
            Err(RosterError::RegistrationClosed)
        ));
        assert!(matches!(
            roster.admissible(2, false),
            Err(RosterError::RegistrationClosed)
        ));
    }

    #[test]
    fn removing_absent_player_reports_not_registered() {
        let mut roster = Roster::new(2);
        roster.add(player(1), true).unwrap();

        assert!(matches!(roster.remove(2), Err(RosterError::NotRegistered)));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn removal_keeps_order_of_remaining_players() {
        let mut roster = Roster::new(3);
        for id in [1, 2, 3] {
            roster.add(player(id), true).unwrap();
        }
        roster.remove(2).unwrap();

        let ids: Vec<_> = roster.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn loading_drops_duplicates_and_overflow() {
        let roster = Roster::from_players(2, [player(1), player(1), player(2), player(3)]);

        let ids: Vec<_> = roster.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn display_name_skips_blank_last_name() {
        let mut p = player(1);
        p.first_name = "Anna".into();
        p.last_name = Some("  ".into());
        assert_eq!(p.display_name(), "Anna");

        p.last_name = Some("Petrova".into());
        assert_eq!(p.display_name(), "Anna Petrova");
    }
}
