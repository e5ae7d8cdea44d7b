//! Direct-message conversation entities and repository trait.
//!
//! Maps to the `dm_conversations` and `dm_messages` tables. A
//! conversation is an unordered pair of users; the schema stores the
//! pair normalized (`user_a < user_b`) with a unique constraint so the
//! same two people can never own two conversations. Conversation rows
//! are created by the REST service; the relay only resolves them and
//! appends messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A direct-message conversation between exactly two users.
///
/// Maps to the `dm_conversations` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - user_a: BIGINT NOT NULL REFERENCES users(id)
/// - user_b: BIGINT NOT NULL REFERENCES users(id), user_a < user_b
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - UNIQUE (user_a, user_b)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmConversation {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Lower user id of the pair
    pub user_a: i64,

    /// Higher user id of the pair
    pub user_b: i64,

    /// Conversation creation timestamp
    pub created_at: DateTime<Utc>,
}

impl DmConversation {
    /// Both participants of the conversation.
    pub fn participants(&self) -> (i64, i64) {
        (self.user_a, self.user_b)
    }

    /// Whether the given user is one of the two participants.
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }
}

/// A message inside a DM conversation.
///
/// Maps to the `dm_messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - conversation_id: BIGINT NOT NULL REFERENCES dm_conversations(id)
/// - author_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL (max 2000 characters)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmMessage {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Conversation the message belongs to
    pub conversation_id: i64,

    /// Author user ID
    pub author_id: i64,

    /// Message content (up to 2000 characters)
    pub content: String,

    /// Timestamp when the message was persisted
    pub created_at: DateTime<Utc>,
}

/// Repository trait for DM conversation persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DmRepository: Send + Sync {
    /// Find a conversation by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<DmConversation>, AppError>;

    /// Append a message to a conversation. The returned row carries
    /// the database-assigned timestamp.
    async fn append_message(&self, message: &DmMessage) -> Result<DmMessage, AppError>;
}
