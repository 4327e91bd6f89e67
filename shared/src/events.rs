use serde::{Deserialize, Serialize};

/// A chat message as persisted by the message store.
///
/// The delivery core never mutates this; it only forwards it verbatim inside a
/// [`DeliveryEvent::NewMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    #[serde(default)]
    pub has_attachment: bool,
    /// Opaque attachment description (name, size, mime type) owned by the file store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_meta: Option<serde_json::Value>,
    #[serde(default)]
    pub is_read: bool,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Sent once after a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectStatus {
    pub connected: bool,
    pub user_id: String,
    pub role: String,
}

/// Transient push payload. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryEvent {
    NewMessage {
        payload: Message,
    },
    MessageDeleted {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    MessagesRead {
        #[serde(rename = "fromUserId")]
        from_user_id: String,
    },
}

impl DeliveryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::MessagesRead { .. } => "messages_read",
        }
    }
}

/// Server -> client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ConnectStatus(ConnectStatus),
    Message(DeliveryEvent),
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Client -> server frames. Both are advisory: durable changes go through the
/// REST request layer, the socket only carries hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage(serde_json::Value),
    MarkMessagesRead {
        #[serde(rename = "fromUserId")]
        from_user_id: String,
    },
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
