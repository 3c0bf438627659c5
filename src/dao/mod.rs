/// Atomic JSON file persistence shared by every repository.
pub mod json_file;
/// Persisted record definitions.
pub mod models;
/// Repository for the registered players list.
pub mod roster;
/// Repository for scheduler bookkeeping and the registration window.
pub mod schedule;
/// Storage error types.
pub mod storage;
