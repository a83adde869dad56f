use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, on},
    Router,
};
use axum_extra::TypedHeader;
use coverage::{Broadcaster, Subscription};
use futures::stream::{self, Stream, StreamExt as _};
use tokio_util::sync::CancellationToken;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/coverage", get(sse_handler))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Ends when the subscriber is dropped for falling behind, when the client
/// goes away, or on shutdown.
fn snapshot_events(subscription: Subscription) -> impl Stream<Item = Event> {
    stream::unfold(subscription, |mut subscription| async move {
        let snapshot = subscription.recv().await?;
        let event = match Event::default().event("coverage").json_data(&*snapshot) {
            Ok(event) => event,
            Err(why) => {
                log::error!("could not encode snapshot for sse: {}", why);
                return None;
            }
        };
        Some((event, subscription))
    })
}

async fn sse_handler(
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    State(broadcaster): State<Broadcaster>,
    State(shutdown): State<CancellationToken>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = broadcaster.subscribe();
    log::info!(
        "`{}` subscribed to the coverage feed as {}",
        user_agent
            .as_ref()
            .map(|TypedHeader(user_agent)| user_agent.as_str())
            .unwrap_or("unknown client"),
        subscription.id()
    );

    let stream = snapshot_events(subscription)
        .take_until(shutdown.cancelled_owned())
        .map(Ok::<_, axum::Error>);

    Sse::new(stream).keep_alive(KeepAlive::default())
}
