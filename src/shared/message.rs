/**
 * Message Data Structure
 *
 * This module defines the Message record used for one-to-one chat messages
 * and their serialization for transport between client and server.
 *
 * The Message struct is shared between frontend and backend: the server
 * persists and re-broadcasts it, the client keeps an ordered log of it.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Maximum message content length, in characters, after trimming.
pub const MAX_CONTENT_LEN: usize = 500;

/// Represents a single chat message between two users
///
/// The same structure covers both halves of a message's life:
///
/// - An *optimistic* message created on the client has `client_id` set and
///   `id`/`created_at` unset — the server has not confirmed it yet.
/// - A *persisted* message has `id` and `created_at` assigned by the store;
///   the server echo additionally carries the originating `client_id` so the
///   client can reconcile it against its optimistic counterpart.
///
/// # Fields
/// * `id` - Persistence-assigned identifier; `None` until server-confirmed
/// * `client_id` - Client-generated correlation token; present only on
///   client-originated messages before/around confirmation
/// * `sender` / `recipient` - User identifiers
/// * `content` - Message text (1-500 chars, trimmed non-empty at the edges)
/// * `seen` - Whether the recipient has observed this message
/// * `created_at` - Persistence-time timestamp; `None` until confirmed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Assigned by the persistence layer, absent until server-confirmed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<Uuid>,
    /// Client-generated correlation token
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client_id: Option<Uuid>,
    /// Sending user
    pub sender: Uuid,
    /// Receiving user
    pub recipient: Uuid,
    /// The message text content
    pub content: String,
    /// Read-receipt flag, monotonic false -> true
    #[serde(default)]
    pub seen: bool,
    /// Set at persistence time
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create an optimistic, not-yet-confirmed message
    ///
    /// This is the client-side constructor used on send: a fresh `client_id`
    /// is generated so the eventual server echo can be matched back to this
    /// record, while `id` and `created_at` stay unset until the server
    /// confirms the message.
    pub fn optimistic(sender: Uuid, recipient: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: None,
            client_id: Some(Uuid::new_v4()),
            sender,
            recipient,
            content: content.into(),
            seen: false,
            created_at: None,
        }
    }

    /// Whether this message belongs to the conversation between `a` and `b`
    ///
    /// A conversation is an unordered pair: the predicate is
    /// `(sender=a AND recipient=b) OR (sender=b AND recipient=a)`.
    pub fn between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }

    /// Shallow-merge `incoming` onto `existing`, producing the merged record
    ///
    /// This is the pure, total reconciliation merge used by the client store:
    /// fields present on `incoming` overwrite, fields it cannot carry retain
    /// their prior values. Concretely:
    ///
    /// - `id`, `client_id`, `created_at`: `incoming` wins when set, otherwise
    ///   the existing value survives
    /// - `sender`, `recipient`, `content`: taken from `incoming`
    /// - `seen`: logical OR — seen is monotonic, so a partial echo that has
    ///   not observed the flag cannot un-see a message
    ///
    /// The merge is idempotent and, for an optimistic message and its server
    /// echo, commutative: either application order converges to one record.
    pub fn merged(existing: &Message, incoming: &Message) -> Message {
        Message {
            id: incoming.id.or(existing.id),
            client_id: incoming.client_id.or(existing.client_id),
            sender: incoming.sender,
            recipient: incoming.recipient,
            content: incoming.content.clone(),
            seen: existing.seen || incoming.seen,
            created_at: incoming.created_at.or(existing.created_at),
        }
    }
}

/// Validate raw message content, returning the trimmed text
///
/// Content must be non-empty after trimming and at most [`MAX_CONTENT_LEN`]
/// characters. Validation happens at the edges (relay and REST handlers);
/// store operations themselves are total and never validate.
pub fn validate_content(raw: &str) -> Result<String, SharedError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation(
            "content",
            "message content is empty after trimming",
        ));
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(SharedError::validation(
            "content",
            format!("message content exceeds {} characters", MAX_CONTENT_LEN),
        ));
    }
    Ok(trimmed.to_string())
}
