//! Chat message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema. Channel ids
//! are opaque strings owned by the REST layer; the relay records them
//! verbatim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a message posted to a channel of a chat server.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - server_id: BIGINT NOT NULL (servers live in the REST service's schema)
/// - channel_id: VARCHAR(64) NOT NULL
/// - author_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL (max 2000 characters)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// `created_at` is assigned by the database clock at insert time, not
/// by the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Server the message belongs to
    pub server_id: i64,

    /// Channel within the server (opaque to the relay)
    pub channel_id: String,

    /// Author user ID
    pub author_id: i64,

    /// Message content (up to 2000 characters)
    pub content: String,

    /// Timestamp when the message was persisted
    pub created_at: DateTime<Utc>,
}

/// Repository trait for chat message persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message. The returned row carries the
    /// database-assigned timestamp. History reads go through the REST
    /// service, not the relay.
    async fn create(&self, message: &ChatMessage) -> Result<ChatMessage, AppError>;
}
