//! Library crate for roster-bot, exposing modules for the binary and tests.

/// Environment configuration.
pub mod config;
/// JSON file persistence.
pub mod dao;
/// HTTP response payloads.
pub mod dto;
/// HTTP status surface.
pub mod routes;
/// Weekly triggers.
pub mod scheduler;
/// Message handling and notifications.
pub mod services;
/// Shared roster state.
pub mod state;
/// Chat platform seam.
pub mod transport;

#[cfg(test)]
mod test_support;
