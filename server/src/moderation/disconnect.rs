use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use presence_protocol::close::{CLOSE_NORMAL, REASON_SERVER_DISCONNECT};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub user_id: String,
    pub disconnected: bool,
}

/// POST /api/sessions/{user_id}/disconnect: Administrative drop (admin role).
/// Closes the user's connection with "server disconnect"; the client is
/// expected to reconnect on its own after a delay.
pub async fn disconnect_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<DisconnectResponse>, (StatusCode, String)> {
    if !claims.is_admin() {
        return Err((StatusCode::FORBIDDEN, "Admin role required".to_string()));
    }

    if !state
        .sessions
        .disconnect(&user_id, CLOSE_NORMAL, REASON_SERVER_DISCONNECT)
    {
        return Err((StatusCode::NOT_FOUND, "User has no live session".to_string()));
    }

    tracing::info!(admin = %claims.sub, user_id = %user_id, "Administrative disconnect");

    Ok(Json(DisconnectResponse {
        user_id,
        disconnected: true,
    }))
}
