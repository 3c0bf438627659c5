use std::path::PathBuf;

use crate::dao::{
    json_file::JsonFile,
    models::{OrganizerPromptEntity, TriggerLedgerEntity, WindowEntity},
    storage::StorageResult,
};

const WINDOW_FILE_NAME: &str = "window.json";
const TRIGGERS_FILE_NAME: &str = "triggers.json";
const ORGANIZER_FILE_NAME: &str = "organizer.json";

/// Data Access Object for the registration window flag.
#[derive(Debug, Clone)]
pub struct WindowRepository {
    file: JsonFile<WindowEntity>,
}

impl WindowRepository {
    /// Store the window as `window.json` inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(data_dir.into().join(WINDOW_FILE_NAME)),
        }
    }

    /// Last persisted window, if any.
    pub async fn load(&self) -> StorageResult<Option<WindowEntity>> {
        self.file.load().await
    }

    /// Atomically replace the stored window.
    pub async fn save(&self, window: &WindowEntity) -> StorageResult<()> {
        self.file.save(window).await
    }
}

/// Data Access Object for the per-trigger last-fired ledger.
#[derive(Debug, Clone)]
pub struct TriggerLedgerRepository {
    file: JsonFile<TriggerLedgerEntity>,
}

impl TriggerLedgerRepository {
    /// Store the ledger as `triggers.json` inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(data_dir.into().join(TRIGGERS_FILE_NAME)),
        }
    }

    /// Persisted ledger, empty on first run.
    pub async fn load(&self) -> StorageResult<TriggerLedgerEntity> {
        Ok(self.file.load().await?.unwrap_or_default())
    }

    /// Atomically replace the stored ledger.
    pub async fn save(&self, ledger: &TriggerLedgerEntity) -> StorageResult<()> {
        self.file.save(ledger).await
    }
}

/// Data Access Object for the organizer's pending "did the game happen?" question.
#[derive(Debug, Clone)]
pub struct OrganizerPromptRepository {
    file: JsonFile<OrganizerPromptEntity>,
}

impl OrganizerPromptRepository {
    /// Store the question state as `organizer.json` inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(data_dir.into().join(ORGANIZER_FILE_NAME)),
        }
    }

    /// Persisted question state, unarmed on first run.
    pub async fn load(&self) -> StorageResult<OrganizerPromptEntity> {
        Ok(self.file.load().await?.unwrap_or_default())
    }

    /// Atomically replace the stored question state.
    pub async fn save(&self, prompt: &OrganizerPromptEntity) -> StorageResult<()> {
        self.file.save(prompt).await
    }
}
