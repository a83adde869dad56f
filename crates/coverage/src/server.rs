use storage::SnapshotStorage;
use tokio_util::sync::CancellationToken;
use utility::env;

use crate::{
    broadcaster::{self, Broadcaster},
    listener::{self, DeviceListener, ListenerRef},
    pipeline::{self, CoordinatePolicy, IngestHandle, IngestionPipeline},
    store::CoverageStore,
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: CoordinatePolicy,
    pub subscriber_queue: usize,
    pub ingest_queue: usize,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let policy = if env::var_or("COVERAGE_ACCEPT_ALL", false) {
            CoordinatePolicy::accept_all()
        } else {
            CoordinatePolicy::strict()
        };
        Self {
            policy,
            subscriber_queue: env::var_or(
                "COVERAGE_SUBSCRIBER_QUEUE",
                broadcaster::DEFAULT_QUEUE_CAPACITY,
            ),
            ingest_queue: env::var_or("COVERAGE_INGEST_QUEUE", pipeline::DEFAULT_INGEST_QUEUE),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: CoordinatePolicy::default(),
            subscriber_queue: broadcaster::DEFAULT_QUEUE_CAPACITY,
            ingest_queue: pipeline::DEFAULT_INGEST_QUEUE,
        }
    }
}

/// Owns the store, the broadcaster and the running pipeline, and hands out the
/// handles the outer layers need.
pub struct Server<S>
where
    S: SnapshotStorage,
{
    store: CoverageStore<S>,
    broadcaster: Broadcaster,
    ingest: IngestHandle,
    shutdown: CancellationToken,
}

impl<S> Server<S>
where
    S: SnapshotStorage,
{
    pub async fn start(storage: S, config: PipelineConfig) -> Self {
        log::info!("starting with coordinate policy {:?}", config.policy);
        let store = CoverageStore::load(storage).await;
        let broadcaster = Broadcaster::new(store.clone(), config.subscriber_queue);
        let ingest = IngestionPipeline::new(store.clone(), broadcaster.clone(), config.policy)
            .spawn(config.ingest_queue);
        Self {
            store,
            broadcaster,
            ingest,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> CoverageStore<S> {
        self.store.clone()
    }

    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    pub fn ingest_handle(&self) -> IngestHandle {
        self.ingest.clone()
    }

    /// Cancelled by [`Self::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Starts a supervised listener feeding this server's pipeline.
    pub fn listener<L: DeviceListener>(&self, listener: L) -> ListenerRef {
        log::info!("starting listener {}", listener.name());
        listener::run(listener, self.ingest.clone(), self.shutdown.child_token())
    }

    /// Stops all listeners and writes out anything a failed save left behind.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Err(why) = self.store.flush().await {
            log::error!("could not save points on shutdown: {}", why);
        }
    }
}
