use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::TypedHeader;
use coverage::{Broadcaster, Subscription};
use futures::{SinkExt as _, StreamExt as _};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Live coverage feed. The client gets the current snapshot right away and
/// every later one after that. Anything the client sends is ignored.
pub(crate) async fn websocket(
    upgrade: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    State(broadcaster): State<Broadcaster>,
    State(send_timeout): State<Duration>,
    State(shutdown): State<CancellationToken>,
) -> Response {
    let client = user_agent
        .map(|TypedHeader(user_agent)| user_agent.as_str().to_owned())
        .unwrap_or_else(|| "unknown client".to_owned());

    upgrade.on_upgrade(move |socket| async move {
        let subscription = broadcaster.subscribe();
        log::info!("`{}` connected as subscriber {}", client, subscription.id());
        push_snapshots(socket, subscription, send_timeout, shutdown).await;
        log::info!("`{}` disconnected", client);
    })
}

async fn push_snapshots(
    socket: WebSocket,
    mut subscription: Subscription,
    send_timeout: Duration,
    shutdown: CancellationToken,
) {
    let id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    log::warn!("subscriber {} fell behind, closing its socket", id);
                    break;
                };
                let text = match serde_json::to_string(&*snapshot) {
                    Ok(text) => text,
                    Err(why) => {
                        log::error!("could not encode snapshot: {}", why);
                        continue;
                    }
                };
                match timeout(send_timeout, sender.send(Message::Text(text))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(why)) => {
                        log::debug!("could not send to subscriber {}: {}", id, why);
                        break;
                    }
                    Err(_) => {
                        log::warn!("sending to subscriber {} timed out", id);
                        break;
                    }
                }
            }
            message = receiver.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // keep-alive only
                Some(Ok(_)) => {}
            },
            _ = shutdown.cancelled() => break,
        }
    }

    // release the registration before the close handshake
    drop(subscription);
    let _ = timeout(send_timeout, sender.send(Message::Close(None))).await;
}
