use std::{env, io, path::PathBuf};

use async_trait::async_trait;
use model::Snapshot;
use thiserror::Error;

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

pub const DEFAULT_DATA_FILE: &str = "data/points.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("stored snapshot is not valid json: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable home of the current snapshot. Every save replaces the whole
/// document, and a reader never sees a partially written one.
#[async_trait]
pub trait SnapshotStorage: Send + Sync + 'static {
    /// Returns `Ok(None)` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<Snapshot>>;

    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Moves unreadable data out of the way, so that the next save does not
    /// destroy it.
    async fn quarantine(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let data_file = env::var("COVERAGE_DATA_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_owned());
        Self {
            data_file: PathBuf::from(data_file),
        }
    }

    pub fn open(self) -> JsonFileStorage {
        JsonFileStorage::new(self.data_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}
