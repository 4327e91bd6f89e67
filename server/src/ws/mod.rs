pub mod actor;
pub mod handler;
pub mod protocol;
pub mod registry;

use axum::body::Bytes;
use presence_protocol::ServerEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use registry::{Session, SessionRegistry};

/// Identity of one physical connection, distinct from the user it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Work items for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ServerEvent),
    /// Send a close frame and stop writing.
    Close { code: u16, reason: String },
    Ping(Bytes),
    Pong(Bytes),
}

/// Sending half of a live connection.
/// Any task can clone this to push to a specific client; the writer task owns
/// the receiving half and the socket sink.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event. Returns false if the writer side is gone.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(Outbound::Event(event)).is_ok()
    }

    /// Ask the writer to send a close frame with `reason` and shut down.
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.tx
            .send(Outbound::Close {
                code,
                reason: reason.to_string(),
            })
            .is_ok()
    }

    pub(crate) fn send_raw(&self, item: Outbound) -> bool {
        self.tx.send(item).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
