use presence_protocol::ClientEvent;

use crate::auth::Identity;

/// Handle an incoming text frame from a client.
///
/// Client events are advisory only. Durable changes (creating messages,
/// flipping read state) go through the REST endpoints, which also trigger the
/// corresponding pushes, so nothing here mutates state.
pub fn handle_text_message(text: &str, identity: &Identity) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                user_id = %identity.user_id,
                error = %e,
                "Failed to decode client event: {}",
                text.chars().take(100).collect::<String>()
            );
            return;
        }
    };

    match event {
        ClientEvent::SendMessage(payload) => {
            tracing::debug!(
                user_id = %identity.user_id,
                payload = %payload,
                "Client send_message signal"
            );
        }
        ClientEvent::MarkMessagesRead { from_user_id } => {
            tracing::debug!(
                user_id = %identity.user_id,
                from_user_id = %from_user_id,
                "Client mark_messages_read signal"
            );
        }
    }
}
