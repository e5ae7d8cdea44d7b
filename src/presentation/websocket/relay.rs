//! Relay service: event dispatch and identity binding.
//!
//! One `Relay` instance serves the whole process. Each connection's
//! socket task calls [`Relay::dispatch`] for every inbound event and
//! awaits it before reading the next frame, which gives the
//! per-connection ordering guarantee: a sender's events are handled in
//! arrival order, while events from different connections interleave
//! freely at the await points.
//!
//! Every failure converts into exactly one directed `error` event to
//! the offending connection; nothing here tears down a connection or
//! the process.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::{DmRepository, MembershipRepository, MessageRepository, UserRepository};
use crate::infrastructure::metrics;
use crate::shared::snowflake::SnowflakeGenerator;

use super::error::RelayError;
use super::events::{parse_id, ClientEvent, JoinPayload, JoinSuccessPayload, ServerEvent, UserProfile};
use super::registry::{ConnectionId, ConnectionRegistry, Room};

/// The real-time core: registry, fan-out, signaling, and presence
/// hooks behind one dispatch surface.
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    dms: Arc<dyn DmRepository>,
    memberships: Arc<dyn MembershipRepository>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl Relay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        dms: Arc<dyn DmRepository>,
        memberships: Arc<dyn MembershipRepository>,
        snowflake: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            registry,
            users,
            messages,
            dms,
            memberships,
            snowflake,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub(super) fn snowflake(&self) -> &SnowflakeGenerator {
        &self.snowflake
    }

    pub(super) fn messages_repo(&self) -> &dyn MessageRepository {
        self.messages.as_ref()
    }

    pub(super) fn dms_repo(&self) -> &dyn DmRepository {
        self.dms.as_ref()
    }

    /// Handle one inbound event to completion.
    pub async fn dispatch(&self, conn: ConnectionId, event: ClientEvent) {
        let name = event.name();

        let result = match event {
            ClientEvent::Join(payload) => self.handle_join(conn, payload).await,
            ClientEvent::Message(payload) => self.handle_message(conn, payload).await,
            ClientEvent::DmMessage(payload) => self.handle_dm_message(conn, payload).await,
            ClientEvent::CallInitiate(payload) => self.handle_call_initiate(conn, payload).await,
            ClientEvent::CallAccept(payload) => self.handle_call_accept(conn, payload),
            ClientEvent::CallDecline(payload) => self.handle_call_decline(conn, payload),
            ClientEvent::CallOffer(payload) => self.handle_call_offer(conn, payload),
            ClientEvent::CallAnswer(payload) => self.handle_call_answer(conn, payload),
            ClientEvent::IceCandidate(payload) => self.handle_ice_candidate(conn, payload),
            ClientEvent::CallEnd(payload) => self.handle_call_end(conn, payload),
        };

        match result {
            Ok(()) => metrics::record_event(name, true),
            Err(err) => {
                metrics::record_event(name, false);
                self.reject(conn, name, err);
            }
        }
    }

    /// Report a failure to the offending connection and nobody else.
    pub fn reject(&self, conn: ConnectionId, event: &str, err: RelayError) {
        warn!(
            connection = %conn,
            event,
            kind = err.kind(),
            "rejected: {}",
            err
        );
        self.registry.send_to_connection(conn, err.to_event());
    }

    /// `join`: bind the connection's identity and subscribe its rooms.
    ///
    /// The asserted server list is checked against the authoritative
    /// membership table; only confirmed servers are granted. If the
    /// membership read fails, nothing is bound and the client may
    /// retry.
    async fn handle_join(&self, conn: ConnectionId, payload: JoinPayload) -> Result<(), RelayError> {
        let user_id = parse_id("userId", &payload.user_id)?;
        let asserted = payload
            .servers
            .iter()
            .map(|s| parse_id("servers", s))
            .collect::<Result<Vec<i64>, RelayError>>()?;

        let member_of = self
            .memberships
            .server_ids_for_user(user_id)
            .await
            .map_err(|err| {
                error!(user_id, error = %err, "membership lookup failed during join");
                RelayError::Persistence("Failed to verify server membership".into())
            })?;

        let granted: Vec<i64> = asserted
            .iter()
            .copied()
            .filter(|id| member_of.contains(id))
            .collect();
        if granted.len() < asserted.len() {
            warn!(
                connection = %conn,
                user_id,
                asserted = asserted.len(),
                granted = granted.len(),
                "join asserted servers the user does not belong to"
            );
        }

        let mut rooms = Vec::with_capacity(granted.len() + 1);
        rooms.push(Room::User(user_id));
        rooms.extend(granted.iter().map(|&id| Room::Server(id)));

        if !self.registry.bind(conn, user_id, rooms) {
            // Disconnected while the membership read was in flight
            debug!(connection = %conn, user_id, "join raced a disconnect; dropped");
            return Ok(());
        }

        debug!(connection = %conn, user_id, servers = granted.len(), "identity bound");

        // Directed ack so the client can distinguish success from a
        // lost frame and retry the join otherwise
        self.registry.send_to_connection(
            conn,
            ServerEvent::JoinSuccess(JoinSuccessPayload {
                user_id: user_id.to_string(),
                servers: granted.iter().map(|id| id.to_string()).collect(),
            }),
        );
        Ok(())
    }

    /// The identity bound to the connection, or `Unauthenticated`.
    pub(super) fn require_identity(&self, conn: ConnectionId) -> Result<i64, RelayError> {
        self.registry
            .bound_user(conn)
            .ok_or(RelayError::Unauthenticated)
    }

    /// Profile snapshot for outbound payloads, taken at send time.
    ///
    /// A missing row is a data-integrity anomaly: logged loudly, and
    /// the caller proceeds with a `null` profile. A failed read is a
    /// persistence error; callers decide whether that reaches the
    /// sender (fan-out) or is swallowed (signaling, presence).
    pub(super) async fn profile_snapshot(
        &self,
        user_id: i64,
    ) -> Result<Option<UserProfile>, RelayError> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => Ok(Some(UserProfile::from(&user))),
            Ok(None) => {
                error!(user_id, "user row missing while resolving profile snapshot");
                Ok(None)
            }
            Err(err) => {
                error!(user_id, error = %err, "profile lookup failed");
                Err(RelayError::Persistence("Failed to resolve user profile".into()))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::test_support::{connect, drain, relay_with, Mocks};
    use super::*;
    use crate::presentation::websocket::events::{CallTargetPayload, SendMessagePayload};

    #[tokio::test]
    async fn test_join_grants_only_confirmed_servers() {
        let mut mocks = Mocks::default();
        mocks
            .memberships
            .expect_server_ids_for_user()
            .returning(|_| Ok(vec![1, 3]));
        let relay = relay_with(mocks);
        let (conn, mut rx) = connect(&relay);

        relay
            .dispatch(
                conn,
                ClientEvent::Join(JoinPayload {
                    user_id: "42".into(),
                    servers: vec!["1".into(), "2".into()],
                }),
            )
            .await;

        assert_eq!(relay.registry().bound_user(conn), Some(42));
        assert!(relay.registry().in_room(conn, Room::Server(1)));
        assert!(!relay.registry().in_room(conn, Room::Server(2)));
        assert!(relay.registry().in_room(conn, Room::User(42)));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["event"], "join-success");
        assert_eq!(value["data"]["userId"], "42");
        assert_eq!(value["data"]["servers"], json!(["1"]));
    }

    #[tokio::test]
    async fn test_join_with_malformed_user_id_binds_nothing() {
        let relay = relay_with(Mocks::default());
        let (conn, mut rx) = connect(&relay);

        relay
            .dispatch(
                conn,
                ClientEvent::Join(JoinPayload {
                    user_id: "not-a-snowflake".into(),
                    servers: vec![],
                }),
            )
            .await;

        assert_eq!(relay.registry().bound_user(conn), None);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["event"], "error");
    }

    #[tokio::test]
    async fn test_join_membership_failure_reaches_sender_only() {
        let mut mocks = Mocks::default();
        mocks
            .memberships
            .expect_server_ids_for_user()
            .returning(|_| Err(crate::shared::error::AppError::Internal("down".into())));
        let relay = relay_with(mocks);
        let (conn, mut rx) = connect(&relay);

        relay
            .dispatch(
                conn,
                ClientEvent::Join(JoinPayload {
                    user_id: "42".into(),
                    servers: vec!["1".into()],
                }),
            )
            .await;

        assert_eq!(relay.registry().bound_user(conn), None);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(
            value["data"]["message"],
            "Failed to verify server membership"
        );
    }

    #[tokio::test]
    async fn test_rejoin_replaces_previous_subscriptions() {
        let mut mocks = Mocks::default();
        let mut memberships = vec![vec![2], vec![1]]; // popped in reverse
        mocks
            .memberships
            .expect_server_ids_for_user()
            .times(2)
            .returning(move |_| Ok(memberships.pop().unwrap_or_default()));
        let relay = relay_with(mocks);
        let (conn, mut rx) = connect(&relay);

        relay
            .dispatch(
                conn,
                ClientEvent::Join(JoinPayload {
                    user_id: "42".into(),
                    servers: vec!["1".into(), "2".into()],
                }),
            )
            .await;
        relay
            .dispatch(
                conn,
                ClientEvent::Join(JoinPayload {
                    user_id: "42".into(),
                    servers: vec!["1".into(), "2".into()],
                }),
            )
            .await;

        assert!(!relay.registry().in_room(conn, Room::Server(1)));
        assert!(relay.registry().in_room(conn, Room::Server(2)));
        assert_eq!(drain(&mut rx).len(), 2); // two acks
    }

    #[tokio::test]
    async fn test_unbound_connection_cannot_trigger_side_effects() {
        // No repository expectations: any persistence or lookup call
        // panics the test
        let relay = relay_with(Mocks::default());
        let (conn, mut rx) = connect(&relay);
        let (_other, mut other_rx) = connect(&relay);

        relay
            .dispatch(
                conn,
                ClientEvent::Message(SendMessagePayload {
                    server_id: "1".into(),
                    channel_id: "general".into(),
                    content: "hi".into(),
                }),
            )
            .await;
        relay
            .dispatch(
                conn,
                ClientEvent::CallEnd(CallTargetPayload { to: "7".into() }),
            )
            .await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], "error");
            assert_eq!(value["data"]["message"], "User not authenticated");
        }
        assert!(drain(&mut other_rx).is_empty());
    }
}
