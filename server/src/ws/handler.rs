use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use presence_protocol::close::CLOSE_POLICY_VIOLATION;
use serde::Deserialize;

use crate::auth::{authenticate, ConnectionAttempt};
use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for WebSocket connection.
/// The credential may come as ?token=JWT or as an Authorization: Bearer header.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// GET /ws?token=JWT
/// WebSocket upgrade endpoint.
/// On auth failure, upgrades then immediately closes with the refusal reason.
/// On success, spawns an actor for the connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let attempt = ConnectionAttempt::new(params.token, &headers);

    match authenticate(&state.jwt_secret, &attempt) {
        Ok(identity) => {
            tracing::info!(
                user_id = %identity.user_id,
                role = %identity.role,
                "WebSocket connection authenticated"
            );
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, identity))
        }
        Err(err) => {
            let reason = err.close_reason();
            tracing::warn!(reason = reason, "WebSocket auth failed");

            // Upgrade the connection, then immediately close with the reason text
            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_POLICY_VIOLATION,
                    reason: reason.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}
