/**
 * Message Persistence Contract
 *
 * This module defines the durable message store contract shared by the
 * real-time relay and the REST surface — both write and read through the
 * same trait, which is what keeps the two paths consistent.
 *
 * # Concurrency
 *
 * No locking is required at this layer: `create` is append-only and
 * `mark_as_seen` is a monotonic, commutative predicate-scoped update, so
 * concurrent callers cannot corrupt state or need to coordinate.
 *
 * # Implementations
 *
 * - [`PostgresMessageStore`] - the production store (sqlx)
 * - [`InMemoryMessageStore`] - in-process store backing tests and
 *   database-less development runs
 */
use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::message::Message;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryMessageStore;
pub use postgres::PostgresMessageStore;

/// Durable append-only message store
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message
    ///
    /// Returns the stored record with a generated `id`, `seen = false` and
    /// `created_at` set to persistence time. Append-only.
    async fn create(
        &self,
        sender: Uuid,
        recipient: Uuid,
        content: &str,
    ) -> Result<Message, BackendError>;

    /// Mark every unseen message from `sender` to `recipient` as seen
    ///
    /// Returns the number of records flipped. Idempotent: a second call with
    /// nothing left unseen returns 0, never errors.
    async fn mark_as_seen(&self, sender: Uuid, recipient: Uuid) -> Result<u64, BackendError>;

    /// All messages sent or received by `user`, oldest first
    async fn messages_for_user(
        &self,
        user: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, BackendError>;

    /// The conversation between `a` and `b` (both directions), oldest first
    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, BackendError>;

    /// Total unseen messages addressed to `recipient`
    async fn unseen_count(&self, recipient: Uuid) -> Result<i64, BackendError>;
}
