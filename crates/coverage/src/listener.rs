use std::{any::Any, fmt::Debug, panic::AssertUnwindSafe, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::FutureExt as _;
use serde::Serialize;
use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::pipeline::IngestHandle;

/// Connection to a radio device that yields raw text messages.
#[async_trait]
pub trait DeviceListener: Send + 'static {
    type Error: Debug + Send;

    /// Human readable name, used in logs and the status report.
    fn name(&self) -> String;

    /// (Re)establishes the connection.
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Waits for the next text message. `Ok(None)` means the device closed the
    /// connection.
    async fn receive(&mut self) -> Result<Option<String>, Self::Error>;

    /// Delay before the first reconnect attempt after a failure.
    fn initial_backoff(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Upper bound for the delay between reconnect attempts.
    fn max_backoff(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Progressively increases the waiting time between consecutive failures.
    fn backoff(&self, last_backoff: Duration) -> Duration {
        (last_backoff * 2).min(self.max_backoff())
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "state")]
pub enum ConnectionStatus {
    /// No listener configured.
    Idle,
    Connecting {
        attempt: u32,
    },
    Connected {
        since: DateTime<Local>,
    },
    Disconnected {
        since: DateTime<Local>,
        last_error: Option<String>,
        retry_in_secs: f64,
    },
    Stopped,
}

/// Observes a supervised listener.
#[derive(Debug, Clone)]
pub struct ListenerRef {
    name: String,
    status: watch::Receiver<ConnectionStatus>,
}

impl ListenerRef {
    /// A listener that never runs, for setups without a device.
    pub fn idle() -> Self {
        let (_, status) = watch::channel(ConnectionStatus::Idle);
        Self {
            name: "none".to_owned(),
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }
}

enum Outcome {
    /// The connection ended, try again.
    Reconnect(Option<String>),
    /// Shut down or nobody to deliver to anymore.
    Exit,
}

fn panic_message(why: &(dyn Any + Send)) -> String {
    why.downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| why.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

async fn run_connection<L: DeviceListener>(
    listener: &mut L,
    ingest: &IngestHandle,
    status: &watch::Sender<ConnectionStatus>,
    attempt: u32,
) -> Outcome {
    let _ = status.send(ConnectionStatus::Connecting { attempt });
    if let Err(why) = listener.connect().await {
        log::warn!("could not connect to {}: {:?}", listener.name(), why);
        return Outcome::Reconnect(Some(format!("{:?}", why)));
    }

    log::info!("connected to {}", listener.name());
    let _ = status.send(ConnectionStatus::Connected {
        since: Local::now(),
    });

    loop {
        match listener.receive().await {
            Ok(Some(message)) => {
                log::debug!("received message from {}: {:?}", listener.name(), message);
                if ingest.submit(message).await.is_err() {
                    log::warn!("ingestion has stopped, {} exits", listener.name());
                    return Outcome::Exit;
                }
            }
            Ok(None) => {
                log::warn!("{} closed the connection", listener.name());
                return Outcome::Reconnect(None);
            }
            Err(why) => {
                log::warn!("connection to {} failed: {:?}", listener.name(), why);
                return Outcome::Reconnect(Some(format!("{:?}", why)));
            }
        }
    }
}

/// Runs `listener` on its own task, forwarding every message to `ingest`.
///
/// Failed connections, errors and panics lead to reconnect attempts with
/// growing delays. The only ways out are `shutdown` and a stopped pipeline.
pub fn run<L>(
    mut listener: L,
    ingest: IngestHandle,
    shutdown: CancellationToken,
) -> ListenerRef
where
    L: DeviceListener,
{
    let name = listener.name();
    let (status, status_receiver) =
        watch::channel(ConnectionStatus::Connecting { attempt: 1 });

    tokio::spawn(async move {
        let mut backoff = listener.initial_backoff();
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let connection =
                AssertUnwindSafe(run_connection(&mut listener, &ingest, &status, attempt))
                    .catch_unwind();
            let result = tokio::select! {
                result = connection => result,
                _ = shutdown.cancelled() => break,
            };

            let last_error = match result {
                Ok(Outcome::Exit) => break,
                Ok(Outcome::Reconnect(last_error)) => last_error,
                Err(why) => {
                    let message = panic_message(&*why);
                    log::error!("{} panicked: {}", listener.name(), message);
                    Some(message)
                }
            };

            // a connection that was up resets the delay
            if matches!(*status.borrow(), ConnectionStatus::Connected { .. }) {
                backoff = listener.initial_backoff();
                attempt = 0;
            }

            log::info!("reconnecting to {} in {:?}", listener.name(), backoff);
            let _ = status.send(ConnectionStatus::Disconnected {
                since: Local::now(),
                last_error,
                retry_in_secs: backoff.as_secs_f64(),
            });

            tokio::select! {
                _ = sleep(backoff) => {}
                _ = shutdown.cancelled() => break,
            }
            backoff = listener.backoff(backoff);
        }

        let _ = status.send(ConnectionStatus::Stopped);
        log::info!("{} stopped", listener.name());
    });

    ListenerRef {
        name,
        status: status_receiver,
    }
}
