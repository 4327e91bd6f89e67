use async_trait::async_trait;
use presence_protocol::{ClientEvent, ServerEvent};

use crate::error::TransportError;

/// One inbound frame from a live link.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(ServerEvent),
    /// The peer closed. Carries the close reason text when one was sent.
    Closed(Option<String>),
}

/// Opens links to the server. One call is one connection attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Link: Link;

    async fn open(&self, credential: &str) -> Result<Self::Link, TransportError>;
}

#[async_trait]
pub trait Link: Send + 'static {
    /// Next frame. An ended stream is reported as `Frame::Closed(None)`.
    async fn recv(&mut self) -> Result<Frame, TransportError>;

    async fn send(&mut self, event: &ClientEvent) -> Result<(), TransportError>;

    /// Close the link. Must be safe to call on an already closed link.
    async fn close(&mut self);
}
