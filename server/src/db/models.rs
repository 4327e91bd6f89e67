/// Database row types.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.
use presence_protocol::Message;
use rusqlite::Row;

/// Row in the messages table
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub has_attachment: bool,
    /// JSON text
    pub attachment_meta: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl MessageRow {
    /// Column order expected by [`MessageRow::from_row`].
    pub const COLUMNS: &'static str =
        "id, from_user_id, to_user_id, content, has_attachment, attachment_meta, is_read, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_user_id: row.get(1)?,
            to_user_id: row.get(2)?,
            content: row.get(3)?,
            has_attachment: row.get(4)?,
            attachment_meta: row.get(5)?,
            is_read: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    /// Wire shape. Unparseable attachment metadata is dropped rather than
    /// failing the whole message.
    pub fn into_message(self) -> Message {
        let attachment_meta = self
            .attachment_meta
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        Message {
            id: self.id,
            from_user_id: self.from_user_id,
            to_user_id: self.to_user_id,
            content: self.content,
            has_attachment: self.has_attachment,
            attachment_meta,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}
