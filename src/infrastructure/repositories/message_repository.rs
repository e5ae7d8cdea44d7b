//! Message Repository Implementation
//!
//! PostgreSQL persistence for channel messages. Inserts leave
//! `created_at` to the database clock so message timestamps are
//! server-ordered regardless of sender clocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ChatMessage, MessageRepository};
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    server_id: i64,
    channel_id: String,
    author_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    /// Converts database row to domain ChatMessage entity.
    fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            server_id: self.server_id,
            channel_id: self.channel_id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    /// Persist a new message.
    ///
    /// The message ID is a pre-generated Snowflake ID from the
    /// application layer; `created_at` comes back from the database.
    async fn create(&self, message: &ChatMessage) -> Result<ChatMessage, AppError> {
        let row = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO messages (id, server_id, channel_id, author_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, server_id, channel_id, author_id, content, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.server_id)
        .bind(&message.channel_id)
        .bind(message.author_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }
}
