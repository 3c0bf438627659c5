//! User-facing message texts.

use crate::state::roster::{Player, RosterError};

/// Reply to `/start`.
pub fn greeting(first_name: Option<&str>) -> String {
    match first_name {
        Some(name) => format!("Hi, {name}! Welcome to the volleyball bot 🏐"),
        None => "Hi! Welcome to the volleyball bot 🏐".to_string(),
    }
}

/// Senders without a first name cannot play.
pub const MISSING_FIRST_NAME: &str =
    "⚠️ Your account has no first name. Please set one in your profile settings.";
/// Fallback for text that is not a known action.
pub const UNRECOGNIZED: &str = "Please choose an action from the keyboard.";
/// Confirms a departure.
pub const UNREGISTERED: &str = "You have left the game.";
/// Reply to "no" on a pending registration.
pub const REGISTRATION_CANCELLED: &str = "Registration cancelled.";
/// Listing of an empty roster.
pub const EMPTY_ROSTER: &str = "The list is empty.";
/// Shown when a write could not be persisted.
pub const TRY_AGAIN_LATER: &str = "⚠️ Something went wrong, please try again later.";
/// Organizer answered that the game took place.
pub const ORGANIZER_THANKS: &str = "Thanks! Payment reminder sent to the group.";
/// Organizer answered that the game did not take place.
pub const ORGANIZER_NOTED: &str = "Noted, no payment reminder will be sent.";
/// Weekly opening announcement.
pub const REGISTRATION_OPEN: &str = "📣 Registration for the next game is open!";
/// Sent to everyone cleared from the roster.
pub const GAME_CONCLUDED: &str = "✅ The game is over. The player list has been cleared.";

/// Asks the sender to confirm signing up for `game_day`.
pub fn confirm_prompt(game_day: &str) -> String {
    format!("The game is on {game_day}. Do you want to sign up?")
}

/// Confirms a completed registration.
pub fn registered(game_day: &str) -> String {
    format!("You are signed up for the game on {game_day}! ✅")
}

/// "Yes" without a pending registration.
pub fn nothing_to_confirm() -> String {
    "Nothing to confirm. Choose '📥 Register' on the keyboard first.".to_string()
}

/// "No" without a pending registration.
pub fn nothing_to_cancel() -> String {
    "Nothing to cancel.".to_string()
}

/// Reply for a rejected registration or failed confirmation.
pub fn rejection(err: &RosterError) -> String {
    match err {
        RosterError::RegistrationClosed => "⛔️ Registration is closed.".to_string(),
        RosterError::AlreadyRegistered => "You are already signed up ✅".to_string(),
        RosterError::Full { capacity } => {
            format!("⛔️ All spots are taken! Maximum {capacity} players.")
        }
        RosterError::NotRegistered => "You were not signed up.".to_string(),
        RosterError::NothingPending => nothing_to_confirm(),
        RosterError::Storage(_) => TRY_AGAIN_LATER.to_string(),
    }
}

/// Administrator notice for a new player.
pub fn admin_registered(player: &Player) -> String {
    format!("📥 {} signed up for the game.", player.display_name())
}

/// Notice that a player left and a spot is free.
pub fn spot_freed(player: &Player) -> String {
    format!("⚠️ {} freed up a spot for the game.", player.display_name())
}

/// Numbered roster in registration order.
pub fn roster_listing(players: &[Player]) -> String {
    if players.is_empty() {
        return EMPTY_ROSTER.to_string();
    }
    let lines = players
        .iter()
        .enumerate()
        .map(|(index, player)| format!("{}. {}", index + 1, player.display_name()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("📋 Player list:\n{lines}")
}

/// Saturday reminder, followed by payment details when configured.
pub fn payment_reminder(payment_info: Option<&str>) -> String {
    match payment_info {
        Some(info) => format!("💸 Reminder: don't forget to pay for the game!\n{info}"),
        None => "💸 Reminder: don't forget to pay for the game!".to_string(),
    }
}

/// Sunday question to the organizer.
pub const ORGANIZER_QUESTION: &str = "Did today's game take place?";

/// Administrator notice when the organizer says the game was off.
pub const ADMIN_GAME_CANCELLED: &str = "ℹ️ The organizer reported that the game did not take place.";

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64, first: &str, last: Option<&str>) -> Player {
        Player {
            id,
            first_name: first.into(),
            last_name: last.map(Into::into),
            handle: None,
        }
    }

    #[test]
    fn listing_is_numbered_in_order() {
        let players = [player(1, "Anna", Some("Petrova")), player(2, "Ivan", None)];
        assert_eq!(
            roster_listing(&players),
            "📋 Player list:\n1. Anna Petrova\n2. Ivan"
        );
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(roster_listing(&[]), EMPTY_ROSTER);
    }

    #[test]
    fn full_rejection_mentions_capacity() {
        assert!(rejection(&RosterError::Full { capacity: 12 }).contains("12"));
    }
}
