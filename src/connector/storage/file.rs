//! File-backed key/value storage: one `<key>.json` file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::KeyValueStore;
use crate::domain::DomainError;

pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DomainError::invalid_input(format!("Invalid store key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::storage(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        // staged write, renamed into place
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value).await?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!("Saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}
