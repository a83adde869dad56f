use thiserror::Error;

pub mod broadcaster;
pub mod hull;
pub mod listener;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod store;

pub use broadcaster::{Broadcaster, Subscription};
pub use pipeline::{CoordinatePolicy, IngestHandle, IngestionPipeline};
pub use store::{CoverageStore, SnapshotQuery, StoreStatus};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("the ingestion task has stopped")]
    Stopped,
}
