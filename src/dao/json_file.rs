//! Whole-file JSON persistence with write-to-temporary-then-rename semantics.

use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use super::storage::{StorageError, StorageResult};

/// A single JSON document on disk that is always replaced atomically.
///
/// Readers either observe the previous document or the new one, never a torn
/// write: the payload is written and synced to a sibling temporary file which is
/// then renamed over the target.
#[derive(Debug)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonFile<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Bind a document to `path`. Nothing is touched on disk until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Read and decode the document. A missing file yields `Ok(None)`.
    pub async fn load(&self) -> StorageResult<Option<T>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(&self.path, err)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                path: self.path.clone(),
                source,
            })
    }

    /// Encode `value` and durably replace the document with it.
    pub async fn save(&self, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io(parent, err))?;
        }

        let tmp_path = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp_path)
                .await
                .map_err(|err| StorageError::io(&tmp_path, err))?;
            file.write_all(&payload)
                .await
                .map_err(|err| StorageError::io(&tmp_path, err))?;
            file.sync_all()
                .await
                .map_err(|err| StorageError::io(&tmp_path, err))?;
        }

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| StorageError::io(&self.path, err))?;

        // The rename itself only survives a crash once the directory entry is synced.
        if let Some(parent) = self.parent_dir() {
            match fs::File::open(parent).await {
                Ok(dir) => {
                    if let Err(err) = dir.sync_all().await {
                        debug!(path = %parent.display(), error = %err, "directory sync skipped");
                    }
                }
                Err(err) => {
                    debug!(path = %parent.display(), error = %err, "directory sync skipped");
                }
            }
        }

        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
