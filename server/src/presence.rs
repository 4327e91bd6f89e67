//! Read-only view of who is online, backed by the session registry.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub online: Vec<String>,
}

/// GET /api/presence: Ids of users with a live session. JWT auth required.
pub async fn get_presence(State(state): State<AppState>, _claims: Claims) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        online: state.sessions.online_users(),
    })
}
