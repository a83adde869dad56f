use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use model::Snapshot;

use crate::{Result, SnapshotStorage};

/// Keeps the snapshot in memory only. Useful for tests and throwaway runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stored: Arc<Mutex<Option<Snapshot>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            stored: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// The last saved snapshot.
    pub fn stored(&self) -> Option<Snapshot> {
        self.stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.stored())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        Ok(())
    }
}
