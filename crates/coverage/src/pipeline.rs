use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt as _;
use model::{Coordinate, Point, Snapshot};
use serde::Serialize;
use storage::SnapshotStorage;
use tokio::sync::mpsc;

use crate::{broadcaster::Broadcaster, parser, store::CoverageStore, IngestError};

pub const DEFAULT_INGEST_QUEUE: usize = 64;

/// Which parsed coordinates are accepted as points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatePolicy {
    /// Reject latitudes outside ±90 and longitudes outside ±180.
    pub require_valid_range: bool,
    /// Reject exactly `(0, 0)`, sent by receivers without a fix.
    pub reject_null_island: bool,
}

impl CoordinatePolicy {
    pub fn strict() -> Self {
        Self {
            require_valid_range: true,
            reject_null_island: true,
        }
    }

    /// Accept anything the parser produces.
    pub fn accept_all() -> Self {
        Self {
            require_valid_range: false,
            reject_null_island: false,
        }
    }

    pub fn check(&self, coordinate: &Coordinate) -> Result<(), Rejection> {
        if self.require_valid_range && !coordinate.is_in_range() {
            return Err(Rejection::OutOfRange);
        }
        if self.reject_null_island && coordinate.is_null_island() {
            return Err(Rejection::NullIsland);
        }
        Ok(())
    }
}

impl Default for CoordinatePolicy {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    NullIsland,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "outside of valid latitude/longitude range"),
            Self::NullIsland => write!(f, "(0, 0) placeholder without gps fix"),
        }
    }
}

/// Turns raw device messages into points and pushes the resulting snapshots
/// to subscribers. The only writer of its [`CoverageStore`].
pub struct IngestionPipeline<S> {
    store: CoverageStore<S>,
    broadcaster: Broadcaster,
    policy: CoordinatePolicy,
}

impl<S> IngestionPipeline<S>
where
    S: SnapshotStorage,
{
    pub fn new(
        store: CoverageStore<S>,
        broadcaster: Broadcaster,
        policy: CoordinatePolicy,
    ) -> Self {
        Self {
            store,
            broadcaster,
            policy,
        }
    }

    /// Handles one message. Returns the new snapshot if the message carried an
    /// acceptable coordinate, `None` if it was discarded.
    pub async fn ingest(&self, raw: &str) -> Option<Arc<Snapshot>> {
        let Some(coordinate) = parser::parse(raw) else {
            log::debug!("no coordinates in message {:?}", raw);
            return None;
        };

        // not subject to the policy, such a point could not be stored
        if !coordinate.is_finite() {
            log::info!("ignoring non-finite coordinate {}", coordinate);
            return None;
        }

        if let Err(rejection) = self.policy.check(&coordinate) {
            log::info!("ignoring coordinate {}: {}", coordinate, rejection);
            return None;
        }

        let snapshot = self.store.append_point(Point::observed_now(coordinate)).await;
        let delivered = self.broadcaster.publish(snapshot.clone());
        log::info!(
            "accepted {} ({} points, {} coverage vertices, sent to {} subscribers)",
            coordinate,
            snapshot.points().len(),
            snapshot.coverage().len(),
            delivered
        );

        Some(snapshot)
    }

    /// Runs the pipeline as a task that handles submitted messages one after
    /// another. The task ends once every [`IngestHandle`] is dropped.
    pub fn spawn(self, queue_capacity: usize) -> IngestHandle {
        let (queue, mut receiver) = mpsc::channel::<String>(queue_capacity.max(1));

        tokio::spawn(async move {
            while let Some(raw) = receiver.recv().await {
                let result = AssertUnwindSafe(self.ingest(&raw)).catch_unwind().await;
                if let Err(why) = result {
                    log::error!("ingestion panicked on message {:?}: {:?}", raw, why);
                }
            }
            log::info!("ingestion stopped");
        });

        IngestHandle { queue }
    }
}

/// Submits raw messages to a running pipeline.
#[derive(Debug, Clone)]
pub struct IngestHandle {
    queue: mpsc::Sender<String>,
}

impl IngestHandle {
    /// Queues a message, waiting while the queue is full.
    pub async fn submit<T: Into<String>>(&self, raw: T) -> Result<(), IngestError> {
        self.queue
            .send(raw.into())
            .await
            .map_err(|_| IngestError::Stopped)
    }
}
