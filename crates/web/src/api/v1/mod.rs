use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use coverage::{
    listener::{ConnectionStatus, ListenerRef},
    Broadcaster, CoverageStore, SnapshotQuery as _, StoreStatus,
};
use model::Snapshot;
use serde::Serialize;
use storage::JsonFileStorage;

use crate::{
    common::{route_not_found, schema, METHOD_FILTER_ALL},
    RouteResult, WebState,
};

mod realtime;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/coverage", get(current_coverage))
        .route("/coverage/schema", get(schema::<Snapshot>))
        .route("/status", get(status))
        .with_state(state.clone())
        .nest_service("/realtime", realtime::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// The latest committed snapshot, exactly as it is stored.
pub(crate) async fn current_coverage(
    State(store): State<CoverageStore<JsonFileStorage>>,
) -> RouteResult<impl IntoResponse> {
    let snapshot = store.current_snapshot();
    let body = serde_json::to_string(&*snapshot)?;
    Ok(([(CONTENT_TYPE, "application/json")], body))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceStatusDto {
    name: String,
    connection: ConnectionStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusDto {
    device: DeviceStatusDto,
    store: StoreStatus,
    subscribers: usize,
}

async fn status(
    State(store): State<CoverageStore<JsonFileStorage>>,
    State(broadcaster): State<Broadcaster>,
    State(listener): State<ListenerRef>,
) -> Json<StatusDto> {
    Json(StatusDto {
        device: DeviceStatusDto {
            name: listener.name().to_owned(),
            connection: listener.status(),
        },
        store: store.status(),
        subscribers: broadcaster.subscriber_count(),
    })
}
