//! Reconnecting client for the presence server.
//!
//! [`ReconnectController`] owns one connection at a time, retries with a fixed
//! delay up to a bounded number of attempts, and releases its timer and link
//! on every exit path. The transport is pluggable through [`Transport`];
//! [`WsTransport`] is the WebSocket implementation.

pub mod controller;
pub mod error;
pub mod machine;
pub mod policy;
pub mod transport;
pub mod ws_transport;

pub use controller::ReconnectController;
pub use error::{ClientError, TransportError};
pub use machine::{ConnectionState, ReconnectMachine, Step};
pub use policy::ReconnectPolicy;
pub use transport::{Frame, Link, Transport};
pub use ws_transport::WsTransport;
