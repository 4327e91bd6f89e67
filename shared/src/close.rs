//! Close-frame reasons.
//!
//! Refusals and server-initiated drops are communicated as close-frame reason
//! text. Codes are informational only; clients decide what to do from the text.

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

pub const REASON_MISSING_CREDENTIAL: &str = "credential not provided";
pub const REASON_AUTH_FAILED: &str = "authentication failed";
/// The same user opened a newer connection; this one was displaced.
pub const REASON_SESSION_REPLACED: &str = "session replaced";
/// Deliberate administrative drop.
pub const REASON_SERVER_DISCONNECT: &str = "server disconnect";
pub const REASON_PONG_TIMEOUT: &str = "pong timeout";

/// Why a connection ended, from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Handshake refused; carries the refusal text.
    AuthRejected(String),
    ServerDisconnect,
    SessionReplaced,
    /// Network failure, EOF, keepalive timeout or any unrecognised close.
    Transport(String),
}

impl DisconnectReason {
    /// Classify a close-frame reason. `None` means the stream ended without one.
    pub fn classify(reason: Option<&str>) -> Self {
        match reason {
            Some(REASON_SERVER_DISCONNECT) => Self::ServerDisconnect,
            Some(REASON_SESSION_REPLACED) => Self::SessionReplaced,
            Some(r @ (REASON_MISSING_CREDENTIAL | REASON_AUTH_FAILED)) => {
                Self::AuthRejected(r.to_string())
            }
            Some(other) if !other.is_empty() => Self::Transport(other.to_string()),
            _ => Self::Transport("connection closed".to_string()),
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthRejected(reason) => write!(f, "rejected: {reason}"),
            Self::ServerDisconnect => f.write_str(REASON_SERVER_DISCONNECT),
            Self::SessionReplaced => f.write_str(REASON_SESSION_REPLACED),
            Self::Transport(reason) => write!(f, "transport: {reason}"),
        }
    }
}
