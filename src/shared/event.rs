/**
 * Real-time Wire Events
 *
 * This module defines the event envelope exchanged over a real-time
 * connection. Events are serialized as `{ "type": ..., "payload": ... }`
 * JSON frames in both directions.
 *
 * # Direction
 *
 * - [`ClientEvent`] - events a connected client sends to the relay
 * - [`ServerEvent`] - events the relay broadcasts to delivery groups, plus
 *   the `ack`/`nack` replies addressed to a single sending connection
 *
 * # Acknowledgement
 *
 * `send_message` carries an optional client-generated `client_id`; the relay
 * answers the originating connection with `ack` (carrying the persisted
 * record) or `nack` (carrying the reason the send was dropped), using that
 * token as the correlation identifier. All other events are fire-and-forget:
 * they are either ephemeral (`typing`, `stop_typing`) or idempotent (`seen`).
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::message::Message;

/// Events received by the relay from a connected client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Ask the relay to persist and deliver a message
    SendMessage {
        receiver_id: Uuid,
        content: String,
        /// Correlation token for the optimistic record; echoed on the
        /// broadcast and on the ack/nack reply
        #[serde(skip_serializing_if = "Option::is_none", default)]
        client_id: Option<Uuid>,
    },
    /// The sender started composing a message to `receiver_id`
    Typing { receiver_id: Uuid },
    /// The sender stopped composing
    StopTyping { receiver_id: Uuid },
    /// The sender has read everything `receiver_id` sent them
    Seen { receiver_id: Uuid },
}

/// Events delivered by the relay to client connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A persisted message, delivered to both participants' groups
    ReceiveMessage(Message),
    /// `user_id` is composing a message to the receiving user
    Typing { user_id: Uuid },
    /// `user_id` stopped composing
    StopTyping { user_id: Uuid },
    /// `reader_id` has read everything `sender_id` sent them
    Seen { reader_id: Uuid, sender_id: Uuid },
    /// Reply to the sending connection: the send was persisted
    Ack { client_id: Uuid, message: Message },
    /// Reply to the sending connection: the send was dropped
    Nack {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        client_id: Option<Uuid>,
        reason: String,
    },
}

impl ServerEvent {
    /// Wrap a persisted message for group delivery
    pub fn receive_message(message: Message) -> Self {
        Self::ReceiveMessage(message)
    }

    /// Build the nack reply for a dropped send
    pub fn nack(client_id: Option<Uuid>, reason: impl Into<String>) -> Self {
        Self::Nack {
            client_id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u8) -> Uuid {
        Uuid::from_u128(n as u128)
    }

    #[test]
    fn test_client_event_envelope_shape() {
        let event = ClientEvent::SendMessage {
            receiver_id: user(2),
            content: "hi".to_string(),
            client_id: Some(user(9)),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "send_message");
        assert_eq!(json["payload"]["receiverId"], user(2).to_string());
        assert_eq!(json["payload"]["clientId"], user(9).to_string());
        assert_eq!(json["payload"]["content"], "hi");
    }

    #[test]
    fn test_send_message_client_id_is_optional() {
        let json = r#"{"type":"send_message","payload":{"receiverId":"00000000-0000-0000-0000-000000000002","content":"hi"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::SendMessage { client_id, .. } => assert!(client_id.is_none()),
            _ => panic!("Expected SendMessage"),
        }
    }

    #[test]
    fn test_typing_event_roundtrip() {
        let event = ClientEvent::Typing { receiver_id: user(2) };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"typing\""));
        let back: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_seen_broadcast_shape() {
        let event = ServerEvent::Seen {
            reader_id: user(1),
            sender_id: user(2),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "seen");
        assert_eq!(json["payload"]["readerId"], user(1).to_string());
        assert_eq!(json["payload"]["senderId"], user(2).to_string());
    }

    #[test]
    fn test_receive_message_payload_is_the_record() {
        let message = Message::optimistic(user(1), user(2), "hi");
        let event = ServerEvent::receive_message(message.clone());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "receive_message");
        assert_eq!(json["payload"]["content"], "hi");
        assert_eq!(
            json["payload"]["clientId"],
            message.client_id.unwrap().to_string()
        );
    }

    #[test]
    fn test_ack_nack_roundtrip() {
        let message = Message::optimistic(user(1), user(2), "hi");
        let ack = ServerEvent::Ack {
            client_id: message.client_id.unwrap(),
            message,
        };
        let back: ServerEvent = serde_json::from_str(&serde_json::to_string(&ack).unwrap()).unwrap();
        assert_eq!(ack, back);

        let nack = ServerEvent::nack(None, "empty content");
        let json = serde_json::to_value(&nack).unwrap();
        assert_eq!(json["type"], "nack");
        assert_eq!(json["payload"]["reason"], "empty content");
    }
}
