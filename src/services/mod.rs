/// Inbound message handling and the dispatch loop.
pub mod chat_service;
/// Health check service.
pub mod health_service;
/// Mapping from message text to participant intents.
pub mod intent;
/// Audience resolution and best-effort fanout.
pub mod notification;
/// User-facing message texts.
pub mod texts;
