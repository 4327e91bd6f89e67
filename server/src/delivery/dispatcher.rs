use presence_protocol::{DeliveryEvent, ServerEvent};

use crate::ws::SessionRegistry;

/// Pushes events to a user's live connection, if there is one.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: SessionRegistry,
}

impl Dispatcher {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Push `event` to `target_user_id`. Returns whether it was handed to a
    /// live connection. A miss is an expected outcome, not an error.
    pub fn deliver(&self, target_user_id: &str, event: DeliveryEvent) -> bool {
        let kind = event.kind();

        let Some(handle) = self.registry.lookup(target_user_id) else {
            tracing::debug!(target_user = %target_user_id, kind, "Delivery miss: no live session");
            return false;
        };

        // The connection may have died between lookup and push; its writer
        // dropping the receiver makes the send fail.
        let delivered = handle.push(ServerEvent::Message(event));
        if delivered {
            tracing::debug!(
                target_user = %target_user_id,
                connection_id = %handle.id(),
                kind,
                "Event delivered"
            );
        } else {
            tracing::debug!(
                target_user = %target_user_id,
                connection_id = %handle.id(),
                kind,
                "Delivery miss: connection closing"
            );
        }
        delivered
    }
}
