use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use presence_protocol::close::{CLOSE_GOING_AWAY, REASON_PONG_TIMEOUT};
use presence_protocol::{ConnectStatus, ServerEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::auth::Identity;
use crate::state::AppState;
use crate::ws::{protocol, ConnectionHandle, Outbound, Session};

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards [`Outbound`] items from an mpsc channel
/// - Keepalive task: pings periodically and closes on a missing pong
/// - Reader loop (this task): handles incoming frames until either side closes
///
/// The session is registered for the lifetime of the reader loop and removed
/// afterwards, unless a newer connection for the same user replaced it.
pub async fn run_connection(socket: WebSocket, state: AppState, identity: Identity) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (handle, rx) = ConnectionHandle::new();
    let connection_id = handle.id();

    // Queued before registration so it is always the first frame on the wire
    handle.push(ServerEvent::ConnectStatus(ConnectStatus {
        connected: true,
        user_id: identity.user_id.clone(),
        role: identity.role.clone(),
    }));

    state.sessions.register(Session {
        user_id: identity.user_id.clone(),
        role: identity.role.clone(),
        handle: handle.clone(),
    });

    tracing::info!(
        user_id = %identity.user_id,
        connection_id = %connection_id,
        "WebSocket actor started"
    );

    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_interval = Duration::from_secs(state.keepalive.ping_interval_secs.max(1));
    let pong_timeout = Duration::from_secs(state.keepalive.pong_timeout_secs.max(1));
    let ping_handle = tokio::spawn(keepalive_task(
        handle.clone(),
        pong_rx,
        ping_interval,
        pong_timeout,
    ));

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(msg)) => match msg {
                    Message::Text(text) => {
                        protocol::handle_text_message(text.as_str(), &identity);
                    }
                    Message::Binary(_) => {
                        tracing::debug!(
                            user_id = %identity.user_id,
                            "Received binary frame (expected JSON text), ignoring"
                        );
                    }
                    Message::Pong(_) => {
                        let _ = pong_tx.send(());
                    }
                    Message::Ping(data) => {
                        handle.send_raw(Outbound::Pong(data));
                    }
                    Message::Close(frame) => {
                        tracing::info!(
                            user_id = %identity.user_id,
                            reason = ?frame,
                            "Client initiated close"
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(
                        user_id = %identity.user_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
                None => {
                    tracing::info!(user_id = %identity.user_id, "WebSocket stream ended");
                    break;
                }
            },
            // Writer stops after sending a server-side close (replaced, admin
            // drop, pong timeout) or when the sink fails.
            _ = &mut writer_handle => {
                tracing::debug!(user_id = %identity.user_id, "Writer finished, ending connection");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    state.sessions.unregister(&identity.user_id, connection_id);

    tracing::info!(
        user_id = %identity.user_id,
        connection_id = %connection_id,
        "WebSocket actor stopped"
    );
}

/// Writer task: receives outbound items from the mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = rx.recv().await {
        let mut last = false;
        let msg = match item {
            Outbound::Event(event) => match event.to_json() {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode server event");
                    continue;
                }
            },
            Outbound::Close { code, reason } => {
                last = true;
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                }))
            }
            Outbound::Ping(data) => Message::Ping(data),
            Outbound::Pong(data) => Message::Pong(data),
        };

        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed: connection is broken
            break;
        }
        if last {
            break;
        }
    }
}

/// Sends periodic pings and closes the connection if a pong does not arrive in time.
async fn keepalive_task(
    handle: ConnectionHandle,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    ping_interval: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        // Only a pong that arrives after this ping counts
        while pong_rx.try_recv().is_ok() {}

        if !handle.send_raw(Outbound::Ping(Bytes::from_static(&[1, 2, 3, 4]))) {
            // Writer task has died: connection is gone
            break;
        }

        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!(connection_id = %handle.id(), "Pong timeout, closing connection");
                handle.close(CLOSE_GOING_AWAY, REASON_PONG_TIMEOUT);
                break;
            }
        }
    }
}
