//! Synchronous SQL for the messages table. Call from `spawn_blocking`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::MessageRow;

/// Fields supplied by the sender.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub has_attachment: bool,
    pub attachment_meta: Option<serde_json::Value>,
}

pub fn insert_message(conn: &Connection, new: NewMessage) -> rusqlite::Result<MessageRow> {
    let row = MessageRow {
        id: uuid::Uuid::now_v7().to_string(),
        from_user_id: new.from_user_id,
        to_user_id: new.to_user_id,
        content: new.content,
        has_attachment: new.has_attachment,
        attachment_meta: new.attachment_meta.map(|v| v.to_string()),
        is_read: false,
        created_at: Utc::now().to_rfc3339(),
    };

    conn.execute(
        "INSERT INTO messages (id, from_user_id, to_user_id, content, has_attachment, attachment_meta, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            row.id,
            row.from_user_id,
            row.to_user_id,
            row.content,
            row.has_attachment,
            row.attachment_meta,
            row.created_at,
        ],
    )?;

    Ok(row)
}

pub fn get_message(conn: &Connection, id: &str) -> rusqlite::Result<Option<MessageRow>> {
    conn.query_row(
        &format!("SELECT {} FROM messages WHERE id = ?1", MessageRow::COLUMNS),
        params![id],
        MessageRow::from_row,
    )
    .optional()
}

/// Messages exchanged between `user_a` and `user_b` in either direction,
/// oldest first, capped at the newest `limit`.
pub fn list_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
    limit: u32,
) -> rusqlite::Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM messages
         WHERE (from_user_id = ?1 AND to_user_id = ?2)
            OR (from_user_id = ?2 AND to_user_id = ?1)
         ORDER BY rowid DESC
         LIMIT ?3",
        MessageRow::COLUMNS
    ))?;

    let mut rows = stmt
        .query_map(params![user_a, user_b, limit as i64], MessageRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.reverse();
    Ok(rows)
}

pub fn delete_message(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Flip every unread message from `sender` to `reader`. Only ever sets
/// `is_read`, never clears it. Returns how many rows changed.
pub fn mark_read(conn: &Connection, reader: &str, sender: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE messages SET is_read = 1
         WHERE to_user_id = ?1 AND from_user_id = ?2 AND is_read = 0",
        params![reader, sender],
    )
}
