//! REST endpoints for sending, listing, deleting and reading messages.
//!
//! Each mutation is persisted inside `spawn_blocking` first; the push to the
//! counterpart's live connection happens only after the write succeeded.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use presence_protocol::{DeliveryEvent, Message};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::messages::store::{self, NewMessage};
use crate::state::AppState;

/// Default page size for conversation history.
const DEFAULT_LIMIT: u32 = 50;
/// Maximum page size for conversation history.
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub to_user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub has_attachment: bool,
    pub attachment_meta: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageResponse {
    pub message: Message,
    pub delivered: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DeleteMessageResponse {
    pub deleted: bool,
    pub delivered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub from_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
    pub notified: bool,
}

/// POST /api/messages: Persist a message, then push it to the recipient.
/// JWT auth required. Body: { "toUserId", "content", "hasAttachment"?, "attachmentMeta"? }
pub async fn create_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<CreateMessageResponse>), StatusCode> {
    let to_user_id = body.to_user_id.trim().to_string();
    if to_user_id.is_empty() || to_user_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.content.trim().is_empty() && !body.has_attachment {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let new = NewMessage {
        from_user_id: claims.sub.clone(),
        to_user_id,
        content: body.content,
        has_attachment: body.has_attachment,
        attachment_meta: body.attachment_meta,
    };

    let row = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::insert_message(&conn, new).map_err(|e| {
            tracing::error!(error = %e, "Failed to persist message");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let message = row.into_message();
    let delivered = state.dispatcher.deliver(
        &message.to_user_id,
        DeliveryEvent::NewMessage {
            payload: message.clone(),
        },
    );

    tracing::info!(
        message_id = %message.id,
        from = %message.from_user_id,
        to = %message.to_user_id,
        delivered,
        "Message created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateMessageResponse { message, delivered }),
    ))
}

/// GET /api/messages/{peer_id}?limit={n}: Conversation between caller and peer.
/// JWT auth required. Oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let db = state.db.clone();
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let rows = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_conversation(&conn, &claims.sub, &peer_id, limit)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(rows.into_iter().map(|r| r.into_message()).collect()))
}

/// DELETE /api/messages/{id}: Sender deletes their own message.
/// JWT auth required. The recipient is told via a message_deleted push.
pub async fn delete_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<Json<DeleteMessageResponse>, StatusCode> {
    let db = state.db.clone();
    let caller = claims.sub.clone();
    let id = message_id.clone();

    let recipient = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let row = store::get_message(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        if row.from_user_id != caller {
            return Err(StatusCode::FORBIDDEN);
        }

        if !store::delete_message(&conn, &id).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)? {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(row.to_user_id)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let delivered = state.dispatcher.deliver(
        &recipient,
        DeliveryEvent::MessageDeleted {
            message_id: message_id.clone(),
        },
    );

    tracing::info!(message_id = %message_id, to = %recipient, delivered, "Message deleted");

    Ok(Json(DeleteMessageResponse {
        deleted: true,
        delivered,
    }))
}

/// POST /api/messages/read: Mark every unread message from `fromUserId` to the
/// caller as read, then notify the original sender.
/// JWT auth required. Body: { "fromUserId" }
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, StatusCode> {
    if body.from_user_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let reader = claims.sub.clone();
    let sender = body.from_user_id.clone();

    let updated = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::mark_read(&conn, &reader, &sender).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    // Nothing flipped means the sender already has (or will fetch) this state
    let notified = updated > 0 && state.receipts.notify_read(&claims.sub, &body.from_user_id);

    tracing::debug!(
        reader = %claims.sub,
        sender = %body.from_user_id,
        updated,
        notified,
        "Messages marked read"
    );

    Ok(Json(MarkReadResponse { updated, notified }))
}
