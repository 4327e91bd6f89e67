/// Failures of a single connection attempt or a live link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connection lost: {0}")]
    Closed(String),
    /// The server refused the handshake; carries its reason text.
    #[error("handshake rejected: {0}")]
    Rejected(String),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("credential not provided")]
    MissingCredential,
    #[error("controller has stopped")]
    Stopped,
}
