//! PostgreSQL message store
//!
//! The production implementation of the persistence contract. One row per
//! message; the schema lives in `migrations/` and carries indexes on the
//! `(sender, recipient)` pair in both directions plus `recipient` alone for
//! unseen counts.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::persistence::MessageStore;
use crate::shared::message::Message;

/// PostgreSQL-backed message store
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::postgres::PgRow) -> Message {
    Message {
        id: Some(row.get("id")),
        client_id: None,
        sender: row.get("sender"),
        recipient: row.get("recipient"),
        content: row.get("content"),
        seen: row.get("seen"),
        created_at: Some(row.get("created_at")),
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn create(
        &self,
        sender: Uuid,
        recipient: Uuid,
        content: &str,
    ) -> Result<Message, BackendError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, sender, recipient, content, seen, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(id)
        .bind(sender)
        .bind(recipient)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id: Some(id),
            client_id: None,
            sender,
            recipient,
            content: content.to_string(),
            seen: false,
            created_at: Some(now),
        })
    }

    async fn mark_as_seen(&self, sender: Uuid, recipient: Uuid) -> Result<u64, BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET seen = TRUE
            WHERE sender = $1 AND recipient = $2 AND seen = FALSE
            "#,
        )
        .bind(sender)
        .bind(recipient)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn messages_for_user(
        &self,
        user: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender, recipient, content, seen, created_at
            FROM messages
            WHERE sender = $1 OR recipient = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender, recipient, content, seen, created_at
            FROM messages
            WHERE (sender = $1 AND recipient = $2) OR (sender = $2 AND recipient = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    async fn unseen_count(&self, recipient: Uuid) -> Result<i64, BackendError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE recipient = $1 AND seen = FALSE
            "#,
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
