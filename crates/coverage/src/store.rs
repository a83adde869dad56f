use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, PoisonError, RwLock,
};

use model::{Point, Snapshot};
use serde::Serialize;
use storage::{SnapshotStorage, StorageError};
use tokio::sync::Mutex;

use crate::hull::compute_hull;

/// Read access to the latest committed snapshot.
pub trait SnapshotQuery: Send + Sync + 'static {
    fn current_snapshot(&self) -> Arc<Snapshot>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub points: usize,
    pub coverage_vertices: usize,
    /// The last save failed, the file on disk is behind the in-memory state.
    pub pending_persist: bool,
}

struct Inner<S> {
    storage: S,
    /// Working copy. Held for the whole read-modify-persist of an append.
    working: Mutex<Snapshot>,
    /// Last fully committed snapshot, swapped atomically after each append.
    committed: RwLock<Arc<Snapshot>>,
    pending_persist: AtomicBool,
}

/// All accepted points plus their coverage, kept in memory and mirrored to a
/// [`SnapshotStorage`].
///
/// Cloning yields another handle to the same store.
pub struct CoverageStore<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for CoverageStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> CoverageStore<S>
where
    S: SnapshotStorage,
{
    /// Opens the store with whatever `storage` holds. Missing or unreadable
    /// data results in an empty store, this never fails.
    pub async fn load(storage: S) -> Self {
        let snapshot = match storage.load().await {
            Ok(Some(stored)) => {
                log::info!("loaded {} stored points", stored.points().len());
                consistent(stored)
            }
            Ok(None) => {
                log::info!("no stored points, starting empty");
                Snapshot::empty()
            }
            Err(why) => {
                log::warn!("could not read stored points, starting empty: {}", why);
                if let StorageError::Corrupt(_) = why {
                    if let Err(why) = storage.quarantine().await {
                        log::error!("could not move unreadable snapshot aside: {}", why);
                    }
                }
                Snapshot::empty()
            }
        };

        let committed = Arc::new(snapshot.clone());
        Self {
            inner: Arc::new(Inner {
                storage,
                working: Mutex::new(snapshot),
                committed: RwLock::new(committed),
                pending_persist: AtomicBool::new(false),
            }),
        }
    }

    /// Appends a point, recomputes the coverage over all points, saves and
    /// commits the result. Appends are serialized.
    ///
    /// A failed save does not undo the append. The store keeps serving the new
    /// state and retries the save on the next append or [`Self::flush`].
    pub(crate) async fn append_point(&self, point: Point) -> Arc<Snapshot> {
        let mut working = self.inner.working.lock().await;

        working.push_point(point);
        let coverage = compute_hull(&working.coordinates());
        working.set_coverage(coverage);

        if let Err(why) = self.persist(&working).await {
            log::error!(
                "could not save {} points, keeping them in memory: {}",
                working.points().len(),
                why
            );
        }

        let committed = Arc::new(working.clone());
        *self
            .inner
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = committed.clone();
        committed
    }

    /// Saves the current state if an earlier save failed.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let working = self.inner.working.lock().await;
        if !self.inner.pending_persist.load(Ordering::Acquire) {
            return Ok(());
        }
        self.persist(&working).await
    }

    pub fn status(&self) -> StoreStatus {
        let current = self.current_snapshot();
        StoreStatus {
            points: current.points().len(),
            coverage_vertices: current.coverage().len(),
            pending_persist: self.inner.pending_persist.load(Ordering::Acquire),
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let result = self.inner.storage.save(snapshot).await;
        let was_pending = self
            .inner
            .pending_persist
            .swap(result.is_err(), Ordering::AcqRel);
        if was_pending && result.is_ok() {
            log::info!("saved {} points after earlier failures", snapshot.points().len());
        }
        result
    }
}

impl<S> SnapshotQuery for CoverageStore<S>
where
    S: SnapshotStorage,
{
    fn current_snapshot(&self) -> Arc<Snapshot> {
        self.inner
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Recomputes the coverage of a stored snapshot from its points.
fn consistent(stored: Snapshot) -> Snapshot {
    let coverage = compute_hull(&stored.coordinates());
    if coverage != *stored.coverage() {
        log::warn!("stored coverage did not match stored points, recomputed it");
    }
    Snapshot::new(stored.points().to_vec(), coverage)
}
