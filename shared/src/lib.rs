//! Wire protocol shared by the presence server and its clients.
//!
//! Every frame is a JSON text message shaped `{"event": <name>, "data": {...}}`.
//! Close frames carry a human-readable reason that clients classify with
//! [`close::DisconnectReason::classify`].

pub mod close;
pub mod events;

pub use close::DisconnectReason;
pub use events::{ClientEvent, ConnectStatus, DeliveryEvent, Message, ServerEvent};
