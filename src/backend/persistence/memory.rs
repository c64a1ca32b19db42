/**
 * In-Memory Message Store
 *
 * A process-local implementation of the persistence contract. It backs the
 * test suite and lets the server run without a configured database; state
 * does not survive a restart.
 */
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::persistence::MessageStore;
use crate::shared::message::Message;

/// In-process message store
///
/// Rows live in an append-ordered `Vec` behind a mutex; the lock is held
/// only for the duration of each synchronous operation, never across an
/// await point.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    rows: Mutex<Vec<Message>>,
}

impl InMemoryMessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(
        &self,
        sender: Uuid,
        recipient: Uuid,
        content: &str,
    ) -> Result<Message, BackendError> {
        let message = Message {
            id: Some(Uuid::new_v4()),
            client_id: None,
            sender,
            recipient,
            content: content.to_string(),
            seen: false,
            created_at: Some(Utc::now()),
        };

        let mut rows = self.rows.lock().expect("message store lock poisoned");
        rows.push(message.clone());
        Ok(message)
    }

    async fn mark_as_seen(&self, sender: Uuid, recipient: Uuid) -> Result<u64, BackendError> {
        let mut rows = self.rows.lock().expect("message store lock poisoned");
        let mut modified = 0;
        for row in rows.iter_mut() {
            if row.sender == sender && row.recipient == recipient && !row.seen {
                row.seen = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn messages_for_user(
        &self,
        user: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, BackendError> {
        let rows = self.rows.lock().expect("message store lock poisoned");
        let matching = rows
            .iter()
            .filter(|m| m.sender == user || m.recipient == user)
            .cloned();
        Ok(match limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, BackendError> {
        let rows = self.rows.lock().expect("message store lock poisoned");
        Ok(rows.iter().filter(|m| m.between(a, b)).cloned().collect())
    }

    async fn unseen_count(&self, recipient: Uuid) -> Result<i64, BackendError> {
        let rows = self.rows.lock().expect("message store lock poisoned");
        Ok(rows
            .iter()
            .filter(|m| m.recipient == recipient && !m.seen)
            .count() as i64)
    }
}
