use presence_protocol::DeliveryEvent;

use super::Dispatcher;

/// Tells a message's original sender that the recipient has read it.
///
/// Only call after the store has durably flipped `is_read`. Never writes
/// anything itself, so repeated calls can at most produce a redundant event.
#[derive(Debug, Clone)]
pub struct ReadReceipts {
    dispatcher: Dispatcher,
}

impl ReadReceipts {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn notify_read(&self, reader_user_id: &str, original_sender_user_id: &str) -> bool {
        self.dispatcher.deliver(
            original_sender_user_id,
            DeliveryEvent::MessagesRead {
                from_user_id: reader_user_id.to_string(),
            },
        )
    }
}
