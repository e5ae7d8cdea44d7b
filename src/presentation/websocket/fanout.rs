//! Message fan-out: one inbound send, one persisted row, one broadcast.
//!
//! Channel messages go to the `server:<id>` room; DM messages go to
//! both participants' `user:<id>` rooms. The sender's own connection
//! receives the authoritative copy like everyone else and reconciles
//! it against its optimistic local echo by message id. A persistence
//! failure aborts the broadcast entirely and is reported to the sender
//! alone.

use chrono::Utc;
use tracing::{debug, error};
use validator::Validate;

use crate::domain::{ChatMessage, DmMessage};
use crate::infrastructure::metrics;

use super::error::RelayError;
use super::events::{
    parse_id, DmBroadcast, MessageBroadcast, SendDmPayload, SendMessagePayload, ServerEvent,
    WireMessage,
};
use super::registry::{ConnectionId, Room};
use super::relay::Relay;

impl Relay {
    /// `message`: persist a channel message and broadcast it to the
    /// server room.
    pub(super) async fn handle_message(
        &self,
        conn: ConnectionId,
        payload: SendMessagePayload,
    ) -> Result<(), RelayError> {
        let author_id = self.require_identity(conn)?;
        payload.validate()?;
        let server_id = parse_id("serverId", &payload.server_id)?;

        // Room subscription is the membership check: join only grants
        // rooms the membership table confirmed
        if !self.registry().in_room(conn, Room::Server(server_id)) {
            return Err(RelayError::NotFound("Server not found".into()));
        }

        let draft = ChatMessage {
            id: self.snowflake().generate(),
            server_id,
            channel_id: payload.channel_id,
            author_id,
            content: payload.content,
            created_at: Utc::now(), // replaced by the database clock
        };
        let persisted = self.messages_repo().create(&draft).await.map_err(|err| {
            error!(author_id, server_id, error = %err, "message persist failed");
            RelayError::Persistence("Failed to store message".into())
        })?;
        metrics::record_message_persisted("channel");

        let author = self.profile_snapshot(author_id).await?;

        let event = ServerEvent::Message(MessageBroadcast {
            server_id: persisted.server_id.to_string(),
            channel_id: persisted.channel_id.clone(),
            message: WireMessage {
                id: persisted.id.to_string(),
                content: persisted.content.clone(),
                timestamp: persisted.created_at,
                author,
            },
        });
        let reached = self.registry().send_to_room(Room::Server(server_id), &event);
        metrics::record_deliveries("channel", reached);
        debug!(
            message_id = persisted.id,
            server_id, reached, "channel message fanned out"
        );
        Ok(())
    }

    /// `dm-message`: append to a conversation and deliver to both
    /// participants' devices.
    pub(super) async fn handle_dm_message(
        &self,
        conn: ConnectionId,
        payload: SendDmPayload,
    ) -> Result<(), RelayError> {
        let author_id = self.require_identity(conn)?;
        payload.validate()?;
        let dm_id = parse_id("dmId", &payload.dm_id)?;

        let conversation = self.dms_repo().find_by_id(dm_id).await.map_err(|err| {
            error!(author_id, dm_id, error = %err, "conversation lookup failed");
            RelayError::Persistence("Failed to load conversation".into())
        })?;
        // A conversation the sender is not part of reads the same as a
        // missing one
        let conversation = conversation
            .filter(|c| c.has_participant(author_id))
            .ok_or_else(|| RelayError::NotFound("Conversation not found".into()))?;

        let draft = DmMessage {
            id: self.snowflake().generate(),
            conversation_id: conversation.id,
            author_id,
            content: payload.content,
            created_at: Utc::now(), // replaced by the database clock
        };
        let persisted = self.dms_repo().append_message(&draft).await.map_err(|err| {
            error!(author_id, dm_id, error = %err, "dm persist failed");
            RelayError::Persistence("Failed to store message".into())
        })?;
        metrics::record_message_persisted("dm");

        let author = self.profile_snapshot(author_id).await?;

        let event = ServerEvent::DmMessage(DmBroadcast {
            dm_id: conversation.id.to_string(),
            message: WireMessage {
                id: persisted.id.to_string(),
                content: persisted.content.clone(),
                timestamp: persisted.created_at,
                author,
            },
        });
        let (first, second) = conversation.participants();
        let mut reached = self.registry().send_to_user(first, &event);
        reached += self.registry().send_to_user(second, &event);
        metrics::record_deliveries("dm", reached);
        debug!(
            message_id = persisted.id,
            dm_id, reached, "dm fanned out to both participants"
        );
        Ok(())
    }
}
