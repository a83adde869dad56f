pub use crate::common::RouteResult;

use std::{path::PathBuf, time::Duration};

use axum::{extract::FromRef, routing::get, Router};
use coverage::{listener::ListenerRef, server::Server, Broadcaster, CoverageStore};
use storage::JsonFileStorage;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use utility::env;

pub mod api;
pub mod common;
pub mod live;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8300";
pub const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Clone, FromRef)]
pub struct WebState {
    pub store: CoverageStore<JsonFileStorage>,
    pub broadcaster: Broadcaster,
    pub listener: ListenerRef,
    /// Upper bound for pushing one snapshot to a live client.
    pub send_timeout: Duration,
    /// Ends live feeds when the server shuts down.
    pub shutdown: CancellationToken,
}

impl WebState {
    pub fn new(
        server: &Server<JsonFileStorage>,
        listener: ListenerRef,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store: server.store(),
            broadcaster: server.broadcaster(),
            listener,
            send_timeout,
            shutdown: server.shutdown_token(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_address: String,
    pub static_dir: PathBuf,
    pub send_timeout: Duration,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var_or("WEB_BIND_ADDRESS", DEFAULT_BIND_ADDRESS.to_owned()),
            static_dir: PathBuf::from(env::var_or(
                "WEB_STATIC_DIR",
                DEFAULT_STATIC_DIR.to_owned(),
            )),
            send_timeout: Duration::from_secs(env::var_or("WEB_SEND_TIMEOUT_SECS", 5u64).max(1)),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            send_timeout: Duration::from_secs(5),
        }
    }
}

pub fn router(state: WebState, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/data", get(api::v1::current_coverage))
        .route("/ws", get(live::websocket))
        .with_state(state.clone())
        .nest_service("/api", api::routes(state))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    routes: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, routes.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

pub async fn start_web_server(
    state: WebState,
    config: &WebConfig,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let routes = router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind_address).await?;
    log::info!(
        "serving on {} with static files from {}",
        listener.local_addr()?,
        config.static_dir.display()
    );
    serve(listener, routes, shutdown).await
}
