//! DM Repository Implementation
//!
//! PostgreSQL persistence for direct-message conversations and their
//! messages. The relay resolves conversations by id and appends rows;
//! conversation creation belongs to the REST service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{DmConversation, DmMessage, DmRepository};
use crate::shared::error::AppError;

/// PostgreSQL DM repository implementation.
pub struct PgDmRepository {
    pool: PgPool,
}

impl PgDmRepository {
    /// Creates a new PgDmRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for conversation queries.
#[derive(Debug, sqlx::FromRow)]
struct DmConversationRow {
    id: i64,
    user_a: i64,
    user_b: i64,
    created_at: DateTime<Utc>,
}

impl DmConversationRow {
    fn into_conversation(self) -> DmConversation {
        DmConversation {
            id: self.id,
            user_a: self.user_a,
            user_b: self.user_b,
            created_at: self.created_at,
        }
    }
}

/// Internal row type for DM message queries.
#[derive(Debug, sqlx::FromRow)]
struct DmMessageRow {
    id: i64,
    conversation_id: i64,
    author_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl DmMessageRow {
    fn into_message(self) -> DmMessage {
        DmMessage {
            id: self.id,
            conversation_id: self.conversation_id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl DmRepository for PgDmRepository {
    /// Find a conversation by ID.
    ///
    /// Returns None if the conversation does not exist.
    async fn find_by_id(&self, id: i64) -> Result<Option<DmConversation>, AppError> {
        let row = sqlx::query_as::<_, DmConversationRow>(
            r#"
            SELECT id, user_a, user_b, created_at
            FROM dm_conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_conversation()))
    }

    /// Append a message to a conversation.
    async fn append_message(&self, message: &DmMessage) -> Result<DmMessage, AppError> {
        let row = sqlx::query_as::<_, DmMessageRow>(
            r#"
            INSERT INTO dm_messages (id, conversation_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, author_id, content, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.author_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }
}
