use std::path::PathBuf;

use crate::{
    dao::{json_file::JsonFile, models::PlayerEntity, storage::StorageResult},
    state::roster::Player,
};

const ROSTER_FILE_NAME: &str = "players.json";

/// Data Access Object for the persisted list of registered players.
#[derive(Debug, Clone)]
pub struct RosterRepository {
    file: JsonFile<Vec<PlayerEntity>>,
}

impl RosterRepository {
    /// Store the roster as `players.json` inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(data_dir.into().join(ROSTER_FILE_NAME))
    }

    /// Store the roster at an explicit `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// Load the players in their persisted order. No file means no players.
    pub async fn load(&self) -> StorageResult<Vec<Player>> {
        let entities = self.file.load().await?.unwrap_or_default();
        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Overwrite the persisted roster with `players`.
    pub async fn save(&self, players: &[Player]) -> StorageResult<()> {
        let entities = players.iter().map(PlayerEntity::from).collect::<Vec<_>>();
        self.file.save(&entities).await
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.user_id,
            first_name: value.first_name,
            last_name: Some(value.last_name).filter(|last| !last.trim().is_empty()),
            handle: value.username,
        }
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            user_id: value.id,
            first_name: value.first_name.clone(),
            last_name: value.last_name.clone().unwrap_or_default(),
            username: value.handle.clone(),
        }
    }
}
