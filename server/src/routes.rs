use axum::{middleware, routing, Router};

use crate::auth::middleware::JwtSecret;
use crate::messages::handlers as message_handlers;
use crate::moderation::disconnect;
use crate::presence;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Request layer in front of delivery (JWT required: Claims extractor validates token).
    // Note: the static /api/messages/read segment takes priority over /api/messages/{id}.
    let message_routes = Router::new()
        .route("/api/messages", routing::post(message_handlers::create_message))
        .route("/api/messages/read", routing::post(message_handlers::mark_read))
        .route(
            "/api/messages/{id}",
            routing::get(message_handlers::list_messages).delete(message_handlers::delete_message),
        );

    let session_routes = Router::new()
        .route("/api/presence", routing::get(presence::get_presence))
        .route(
            "/api/sessions/{user_id}/disconnect",
            routing::post(disconnect::disconnect_user),
        );

    // WebSocket endpoint (auth via query param or header, checked by the authenticator)
    let ws_routes = Router::new().route("/ws", routing::get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", routing::get(health_check));

    Router::new()
        .merge(message_routes)
        .merge(session_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
