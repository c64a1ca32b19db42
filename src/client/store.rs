/**
 * Client Message Store
 *
 * This module implements the client-side ordered message log with
 * deduplication and merge logic. The store is the reconciliation point
 * between two mutation sources whose order is not guaranteed: the local
 * optimistic add performed at send time, and the server echo arriving over
 * the real-time channel (possibly more than once after a reconnect).
 *
 * # Reconciliation
 *
 * [`ClientMessageStore::add_message`] matches an incoming record to an
 * existing slot first by persisted `id`, then by the client-generated
 * `client_id` correlation token, and shallow-merges in place; only an
 * unmatchable record appends. Applying an optimistic message and its server
 * echo in either order, or applying the echo twice, converges to exactly
 * one record.
 *
 * # Typing slots
 *
 * Typing signals are tracked per conversation: each unordered user pair has
 * its own single slot, so two different contacts typing concurrently never
 * clobber each other. A stop signal only clears the slot when it comes from
 * the current holder.
 */
use std::collections::HashMap;

use uuid::Uuid;

use crate::shared::conversation::ConversationKey;
use crate::shared::event::ServerEvent;
use crate::shared::message::Message;

/// Ordered, deduplicating client-side message log
///
/// One store instance models one user's session state. It is constructed
/// explicitly and passed by reference; mutation is single-threaded
/// (`&mut self`), so no interior locking is needed — the merge algorithm,
/// not a lock, is what absorbs the unordered interleaving of local adds and
/// remote echoes.
#[derive(Debug, Default)]
pub struct ClientMessageStore {
    /// Append-ordered message log; one slot per logical message
    messages: Vec<Message>,
    /// Current typist per conversation, if any
    typing: HashMap<ConversationKey, Uuid>,
}

impl ClientMessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile an incoming message into the log
    ///
    /// Matching is attempted in priority order:
    ///
    /// 1. by persisted `id` — shallow-merge in place, position unchanged
    /// 2. by `client_id` (whether or not the existing record has an `id`
    ///    yet) — shallow-merge in place, adopting `incoming.id` if present
    /// 3. no match — append as a new record
    ///
    /// The operation is total: a record carrying neither key simply appends.
    pub fn add_message(&mut self, incoming: Message) {
        if let Some(id) = incoming.id {
            if let Some(slot) = self.messages.iter_mut().find(|m| m.id == Some(id)) {
                *slot = Message::merged(slot, &incoming);
                tracing::debug!(message_id = %id, "merged echo by id");
                return;
            }
        }

        if let Some(client_id) = incoming.client_id {
            if let Some(slot) = self
                .messages
                .iter_mut()
                .find(|m| m.client_id == Some(client_id))
            {
                *slot = Message::merged(slot, &incoming);
                tracing::debug!(client_id = %client_id, "merged echo by client id");
                return;
            }
        }

        self.messages.push(incoming);
    }

    /// Mark every message from `sender` to `me` as seen
    ///
    /// Applied on the reader's side when they emit (or learn of) a read
    /// receipt for `sender`'s messages. All other records are untouched,
    /// including the opposite direction of the same conversation.
    pub fn mark_messages_seen_from_sender(&mut self, sender: Uuid, me: Uuid) {
        for message in &mut self.messages {
            if message.sender == sender && message.recipient == me {
                message.seen = true;
            }
        }
    }

    /// Mark every message from `me` to `recipient` as seen
    ///
    /// Applied on the author's side when the opposite party's read receipt
    /// arrives: my own outgoing messages to them are now seen.
    pub fn mark_my_messages_seen(&mut self, me: Uuid, recipient: Uuid) {
        for message in &mut self.messages {
            if message.sender == me && message.recipient == recipient {
                message.seen = true;
            }
        }
    }

    /// Record `typist` as composing within the given conversation
    pub fn set_typing(&mut self, key: ConversationKey, typist: Uuid) {
        self.typing.insert(key, typist);
    }

    /// Clear the conversation's typing slot, if `typist` currently holds it
    ///
    /// A stale stop signal from anyone other than the current holder is a
    /// no-op, so it cannot erase an active signal.
    pub fn clear_typing(&mut self, key: ConversationKey, typist: Uuid) {
        if self.typing.get(&key) == Some(&typist) {
            self.typing.remove(&key);
        }
    }

    /// Who is currently typing in the given conversation, if anyone
    pub fn typist_in(&self, key: &ConversationKey) -> Option<Uuid> {
        self.typing.get(key).copied()
    }

    /// Lazy, order-preserving view of one conversation
    ///
    /// Yields the records satisfying the conversation predicate between
    /// `other` and `me`, in log order. The iterator borrows the store and is
    /// restartable — calling again produces a fresh pass over current state.
    pub fn conversation_with(&self, other: Uuid, me: Uuid) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.between(other, me))
    }

    /// The full log, in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Apply an inbound relay event to this store
    ///
    /// `me` is the identity of the session owning this store; it determines
    /// which side of a read receipt applies and which conversation a typing
    /// signal belongs to.
    pub fn apply_event(&mut self, me: Uuid, event: ServerEvent) {
        match event {
            ServerEvent::ReceiveMessage(message) => self.add_message(message),
            ServerEvent::Ack { message, .. } => self.add_message(message),
            ServerEvent::Nack { client_id, reason } => {
                tracing::warn!(?client_id, %reason, "send was dropped by the relay");
                // Drop the unconfirmed optimistic record so the failure is
                // visible to the UI instead of lingering as a phantom send.
                if let Some(client_id) = client_id {
                    self.messages
                        .retain(|m| !(m.client_id == Some(client_id) && m.id.is_none()));
                }
            }
            ServerEvent::Typing { user_id } => {
                self.set_typing(ConversationKey::new(user_id, me), user_id);
            }
            ServerEvent::StopTyping { user_id } => {
                self.clear_typing(ConversationKey::new(user_id, me), user_id);
            }
            ServerEvent::Seen {
                reader_id,
                sender_id,
            } => {
                if reader_id == me {
                    self.mark_messages_seen_from_sender(sender_id, me);
                }
                if sender_id == me {
                    self.mark_my_messages_seen(me, reader_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(n: u8) -> Uuid {
        Uuid::from_u128(n as u128)
    }

    fn optimistic(client: u8, sender: Uuid, recipient: Uuid, content: &str) -> Message {
        Message {
            id: None,
            client_id: Some(Uuid::from_u128(0xc0 + client as u128)),
            sender,
            recipient,
            content: content.to_string(),
            seen: false,
            created_at: None,
        }
    }

    fn echo_of(optimistic: &Message, id: u8) -> Message {
        let mut echo = optimistic.clone();
        echo.id = Some(Uuid::from_u128(0x50 + id as u128));
        echo.created_at = Some(chrono::Utc::now());
        echo
    }

    #[test]
    fn test_optimistic_then_echo_converges_to_one_record() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let echo = echo_of(&local, 1);

        store.add_message(local.clone());
        store.add_message(echo.clone());

        assert_eq!(store.messages().len(), 1);
        let record = &store.messages()[0];
        assert_eq!(record.id, echo.id);
        assert_eq!(record.client_id, local.client_id);
        assert_eq!(record.content, "hi");
    }

    #[test]
    fn test_echo_then_optimistic_also_converges() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let echo = echo_of(&local, 1);

        store.add_message(echo.clone());
        store.add_message(local);

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].id, echo.id);
    }

    #[test]
    fn test_replayed_echo_is_idempotent() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let echo = echo_of(&local, 1);

        store.add_message(local);
        store.add_message(echo.clone());
        let after_first = store.messages().to_vec();

        // Reconnect replay.
        store.add_message(echo);
        assert_eq!(store.messages(), after_first.as_slice());
    }

    #[test]
    fn test_merge_preserves_position() {
        let mut store = ClientMessageStore::new();
        let first = optimistic(1, user(1), user(2), "first");
        let second = optimistic(2, user(1), user(2), "second");

        store.add_message(first.clone());
        store.add_message(second);
        store.add_message(echo_of(&first, 1));

        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0].content, "first");
        assert!(store.messages()[0].id.is_some());
        assert_eq!(store.messages()[1].content, "second");
    }

    #[test]
    fn test_unmatchable_record_appends() {
        let mut store = ClientMessageStore::new();
        let bare = Message {
            id: None,
            client_id: None,
            sender: user(1),
            recipient: user(2),
            content: "hi".to_string(),
            seen: false,
            created_at: None,
        };

        store.add_message(bare.clone());
        store.add_message(bare);
        // With neither key there is nothing to reconcile against.
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn test_partial_echo_does_not_unsee() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        store.add_message(local.clone());
        store.mark_my_messages_seen(user(1), user(2));

        let mut echo = echo_of(&local, 1);
        echo.seen = false;
        store.add_message(echo);

        assert!(store.messages()[0].seen);
    }

    // Optimistic add, then the confirmed echo sharing the clientId, lands
    // in the same slot with the server id adopted.
    #[test]
    fn test_send_confirmation_scenario() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let mut confirmed = local.clone();
        confirmed.id = Some(Uuid::from_u128(0x51));

        store.add_message(local.clone());
        store.add_message(confirmed);

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].id, Some(Uuid::from_u128(0x51)));
        assert_eq!(store.messages()[0].client_id, local.client_id);
        assert!(!store.messages()[0].seen);
    }

    #[test]
    fn test_seen_scoping_flips_only_one_direction() {
        let mut store = ClientMessageStore::new();
        let mut inbound = optimistic(1, user(2), user(1), "from u2");
        inbound.id = Some(Uuid::from_u128(0x51));
        let mut outbound = optimistic(2, user(1), user(2), "from u1");
        outbound.id = Some(Uuid::from_u128(0x52));
        let mut unrelated = optimistic(3, user(3), user(1), "from u3");
        unrelated.id = Some(Uuid::from_u128(0x53));

        store.add_message(inbound);
        store.add_message(outbound);
        store.add_message(unrelated);

        store.mark_messages_seen_from_sender(user(2), user(1));

        assert!(store.messages()[0].seen, "sender=u2, recipient=u1 flips");
        assert!(!store.messages()[1].seen, "opposite direction untouched");
        assert!(!store.messages()[2].seen, "other senders untouched");
    }

    #[test]
    fn test_mark_my_messages_seen_scoping() {
        let mut store = ClientMessageStore::new();
        store.add_message(optimistic(1, user(1), user(2), "to u2"));
        store.add_message(optimistic(2, user(1), user(3), "to u3"));
        store.add_message(optimistic(3, user(2), user(1), "from u2"));

        store.mark_my_messages_seen(user(1), user(2));

        assert!(store.messages()[0].seen);
        assert!(!store.messages()[1].seen);
        assert!(!store.messages()[2].seen);
    }

    #[test]
    fn test_typing_slot_guard() {
        let mut store = ClientMessageStore::new();
        let key = ConversationKey::new(user(1), user(2));

        store.set_typing(key, user(2));
        // A stale stop from a different sender leaves the holder in place.
        store.clear_typing(key, user(3));
        assert_eq!(store.typist_in(&key), Some(user(2)));

        store.clear_typing(key, user(2));
        assert_eq!(store.typist_in(&key), None);
    }

    #[test]
    fn test_typing_is_scoped_per_conversation() {
        let mut store = ClientMessageStore::new();
        let with_u2 = ConversationKey::new(user(1), user(2));
        let with_u3 = ConversationKey::new(user(1), user(3));

        store.set_typing(with_u2, user(2));
        store.set_typing(with_u3, user(3));
        store.clear_typing(with_u3, user(3));

        assert_eq!(store.typist_in(&with_u2), Some(user(2)));
        assert_eq!(store.typist_in(&with_u3), None);
    }

    #[test]
    fn test_conversation_view_is_scoped_and_restartable() {
        let mut store = ClientMessageStore::new();
        store.add_message(optimistic(1, user(1), user(2), "a"));
        store.add_message(optimistic(2, user(3), user(1), "b"));
        store.add_message(optimistic(3, user(2), user(1), "c"));

        let contents: Vec<&str> = store
            .conversation_with(user(2), user(1))
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["a", "c"]);

        // A second pass over the same state yields the same view.
        let again: Vec<&str> = store
            .conversation_with(user(2), user(1))
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(again, contents);
    }

    #[test]
    fn test_apply_receive_message_reconciles() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        store.add_message(local.clone());

        store.apply_event(user(1), ServerEvent::ReceiveMessage(echo_of(&local, 1)));

        assert_eq!(store.messages().len(), 1);
        assert!(store.messages()[0].id.is_some());
    }

    // Read-receipt round trip: u1 reads u2's messages; the broadcast reaches
    // both stores and each applies its own side of the receipt.
    #[test]
    fn test_apply_seen_routes_to_both_sides() {
        let receipt = ServerEvent::Seen {
            reader_id: user(1),
            sender_id: user(2),
        };

        // Reader's store: the inbound message flips.
        let mut reader_store = ClientMessageStore::new();
        let mut inbound = optimistic(1, user(2), user(1), "hi");
        inbound.id = Some(Uuid::from_u128(0x51));
        reader_store.add_message(inbound);
        reader_store.apply_event(user(1), receipt.clone());
        assert!(reader_store.messages()[0].seen);

        // Author's store: their own outgoing message flips.
        let mut author_store = ClientMessageStore::new();
        let mut outbound = optimistic(1, user(2), user(1), "hi");
        outbound.id = Some(Uuid::from_u128(0x51));
        author_store.add_message(outbound);
        author_store.apply_event(user(2), receipt);
        assert!(author_store.messages()[0].seen);
    }

    #[test]
    fn test_apply_typing_events() {
        let mut store = ClientMessageStore::new();
        let key = ConversationKey::new(user(1), user(2));

        store.apply_event(user(1), ServerEvent::Typing { user_id: user(2) });
        assert_eq!(store.typist_in(&key), Some(user(2)));

        store.apply_event(user(1), ServerEvent::StopTyping { user_id: user(2) });
        assert_eq!(store.typist_in(&key), None);
    }

    #[test]
    fn test_apply_nack_drops_unconfirmed_record() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let client_id = local.client_id;
        store.add_message(local);

        store.apply_event(
            user(1),
            ServerEvent::Nack {
                client_id,
                reason: "content empty".to_string(),
            },
        );
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_apply_nack_never_drops_confirmed_record() {
        let mut store = ClientMessageStore::new();
        let local = optimistic(1, user(1), user(2), "hi");
        let client_id = local.client_id;
        store.add_message(echo_of(&local, 1));

        store.apply_event(
            user(1),
            ServerEvent::Nack {
                client_id,
                reason: "late nack".to_string(),
            },
        );
        assert_eq!(store.messages().len(), 1);
    }
}
