/**
 * Conversation Key
 *
 * A conversation is not a stored entity — it is the unordered pair of the
 * two participating users. This module provides the normalized key type used
 * wherever something must be scoped to one conversation, such as the client
 * store's typing slots.
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized unordered pair of user identifiers
///
/// `ConversationKey::new(a, b)` and `ConversationKey::new(b, a)` produce the
/// same key, so the pair can be used directly as a map key. A user's
/// conversation with themselves is a valid (degenerate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    low: Uuid,
    high: Uuid,
}

impl ConversationKey {
    /// Build the key for the conversation between `a` and `b`, in any order
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The two participants, in normalized order
    pub fn participants(&self) -> (Uuid, Uuid) {
        (self.low, self.high)
    }

    /// Whether `user` is one of the two participants
    pub fn involves(&self, user: Uuid) -> bool {
        self.low == user || self.high == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u8) -> Uuid {
        Uuid::from_u128(n as u128)
    }

    #[test]
    fn test_key_is_unordered() {
        assert_eq!(
            ConversationKey::new(user(1), user(2)),
            ConversationKey::new(user(2), user(1))
        );
    }

    #[test]
    fn test_distinct_pairs_are_distinct_keys() {
        assert_ne!(
            ConversationKey::new(user(1), user(2)),
            ConversationKey::new(user(1), user(3))
        );
    }

    #[test]
    fn test_self_conversation() {
        let key = ConversationKey::new(user(1), user(1));
        assert_eq!(key.participants(), (user(1), user(1)));
        assert!(key.involves(user(1)));
        assert!(!key.involves(user(2)));
    }

    #[test]
    fn test_involves() {
        let key = ConversationKey::new(user(2), user(1));
        assert!(key.involves(user(1)));
        assert!(key.involves(user(2)));
        assert!(!key.involves(user(3)));
    }
}
