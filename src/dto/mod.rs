/// Health check payload.
pub mod health;
/// Roster status payload.
pub mod roster;
