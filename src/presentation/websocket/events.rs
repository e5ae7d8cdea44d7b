//! Wire protocol events.
//!
//! Inbound and outbound event envelopes use an `{ "event": ..., "data":
//! ... }` shape with kebab-case event names. Both directions are closed
//! enums: an event name the relay does not know fails deserialization
//! instead of vanishing silently.
//!
//! Ids travel as stringified snowflakes. SDP offers/answers and ICE
//! candidates are opaque JSON values and are never inspected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::error::RelayError;
use crate::domain::User;
use crate::shared::snowflake;

/// Maximum message content length, in characters
pub const MAX_CONTENT_LENGTH: u64 = 2000;

// ============================================================================
// Client -> server
// ============================================================================

/// Everything a client may send over the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join(JoinPayload),
    Message(SendMessagePayload),
    DmMessage(SendDmPayload),
    CallInitiate(CallInitiatePayload),
    CallAccept(CallTargetPayload),
    CallDecline(CallTargetPayload),
    CallOffer(CallOfferPayload),
    CallAnswer(CallAnswerPayload),
    IceCandidate(IceCandidatePayload),
    CallEnd(CallTargetPayload),
}

impl ClientEvent {
    /// Wire name of the event, for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => "join",
            ClientEvent::Message(_) => "message",
            ClientEvent::DmMessage(_) => "dm-message",
            ClientEvent::CallInitiate(_) => "call-initiate",
            ClientEvent::CallAccept(_) => "call-accept",
            ClientEvent::CallDecline(_) => "call-decline",
            ClientEvent::CallOffer(_) => "call-offer",
            ClientEvent::CallAnswer(_) => "call-answer",
            ClientEvent::IceCandidate(_) => "ice-candidate",
            ClientEvent::CallEnd(_) => "call-end",
        }
    }
}

/// `join`: bind an identity and subscribe to rooms.
///
/// The server list is an assertion; the relay grants only the servers
/// the membership store confirms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub user_id: String,
    pub servers: Vec<String>,
}

/// `message`: post to a server channel.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub server_id: String,

    #[validate(length(min = 1, max = 64, message = "must be 1-64 characters"))]
    pub channel_id: String,

    #[validate(length(min = 1, max = 2000, message = "must be 1-2000 characters"))]
    pub content: String,
}

/// `dm-message`: post to a direct conversation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendDmPayload {
    pub dm_id: String,

    #[validate(length(min = 1, max = 2000, message = "must be 1-2000 characters"))]
    pub content: String,
}

/// Voice or video call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Voice,
    Video,
}

/// `call-initiate`: ring another user.
///
/// Some clients also send a `from` field here; it is ignored. The
/// caller's identity always comes from the connection's binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInitiatePayload {
    pub to: String,

    #[serde(rename = "type")]
    pub call_type: CallKind,
}

/// `call-accept` / `call-decline` / `call-end`: lifecycle events that
/// carry only the target user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTargetPayload {
    pub to: String,
}

/// `call-offer`: forward an SDP offer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOfferPayload {
    pub to: String,
    pub offer: Value,
}

/// `call-answer`: forward an SDP answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswerPayload {
    pub to: String,
    pub answer: Value,
}

/// `ice-candidate`: forward an ICE candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub to: String,
    pub candidate: Value,
}

// ============================================================================
// Server -> client
// ============================================================================

/// Everything the relay may push to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    JoinSuccess(JoinSuccessPayload),
    Message(MessageBroadcast),
    DmMessage(DmBroadcast),
    IncomingCall(IncomingCallPayload),
    CallAccepted(CallPeerPayload),
    CallDeclined(CallPeerPayload),
    CallOffer(CallOfferBroadcast),
    CallAnswer(CallAnswerBroadcast),
    IceCandidate(IceCandidateBroadcast),
    CallEnded(CallPeerPayload),
    FriendRequest(FriendRequestPayload),
    FriendAccepted(FriendAcceptedPayload),
    Error(ErrorPayload),
}

/// Directed ack for a successful `join`, listing the granted servers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuccessPayload {
    pub user_id: String,
    pub servers: Vec<String>,
}

/// A channel message fanned out to a server room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBroadcast {
    pub server_id: String,
    pub channel_id: String,
    pub message: WireMessage,
}

/// A DM fanned out to both participants' user rooms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmBroadcast {
    pub dm_id: String,
    pub message: WireMessage,
}

/// The message body carried by both broadcast kinds.
///
/// `author` is a snapshot taken at send time; it is null when the
/// author row has gone missing, which clients must tolerate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: Option<UserProfile>,
}

/// Profile snapshot attached to messages and call invitations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// `incoming-call`: someone is ringing this user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCallPayload {
    pub from: Option<UserProfile>,

    #[serde(rename = "type")]
    pub call_type: CallKind,

    /// The initiating connection's id; echoes through the rest of the
    /// call lifecycle on the client side
    pub call_id: String,
}

/// Lifecycle relays (`call-accepted`, `call-declined`, `call-ended`)
/// carrying the peer's user id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPeerPayload {
    pub from: String,
}

/// Relayed SDP offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOfferBroadcast {
    pub offer: Value,
    pub from: String,
}

/// Relayed SDP answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswerBroadcast {
    pub answer: Value,
    pub from: String,
}

/// Relayed ICE candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateBroadcast {
    pub candidate: Value,
    pub from: String,
}

/// `friend-request`: a new friend request landed for this user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestPayload {
    pub id: String,
    pub from: Option<UserProfile>,
    pub created_at: DateTime<Utc>,
}

/// `friend-accepted`: a request this user sent was accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendAcceptedPayload {
    pub user_id: String,
}

/// Directed error report; the connection stays open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
}

/// Parse a stringified snowflake coming off the wire.
pub fn parse_id(field: &str, value: &str) -> Result<i64, RelayError> {
    snowflake::from_string(value)
        .map_err(|_| RelayError::Validation(format!("{}: invalid id", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // ==========================================================================
    // Inbound decoding
    // ==========================================================================

    #[test]
    fn test_join_event_deserializes() {
        let raw = json!({
            "event": "join",
            "data": { "userId": "42", "servers": ["1", "2"] }
        });

        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::Join(p) => {
                assert_eq!(p.user_id, "42");
                assert_eq!(p.servers, vec!["1", "2"]);
            }
            other => panic!("expected join, got {:?}", other),
        }
    }

    #[test]
    fn test_dm_message_event_uses_kebab_tag() {
        let raw = json!({
            "event": "dm-message",
            "data": { "dmId": "77", "content": "hey" }
        });

        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::DmMessage(p) => {
                assert_eq!(p.dm_id, "77");
                assert_eq!(p.content, "hey");
            }
            other => panic!("expected dm-message, got {:?}", other),
        }
    }

    #[test]
    fn test_call_initiate_ignores_client_asserted_from() {
        // Legacy clients include a "from" field; identity comes from
        // the binding, so the field must parse away silently
        let raw = json!({
            "event": "call-initiate",
            "data": { "to": "7", "from": "999", "type": "video" }
        });

        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::CallInitiate(p) => {
                assert_eq!(p.to, "7");
                assert_eq!(p.call_type, CallKind::Video);
            }
            other => panic!("expected call-initiate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let raw = json!({ "event": "shout", "data": {} });
        assert!(serde_json::from_value::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn test_unknown_call_kind_is_rejected() {
        let raw = json!({
            "event": "call-initiate",
            "data": { "to": "7", "type": "screen" }
        });
        assert!(serde_json::from_value::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn test_missing_data_is_rejected() {
        let raw = json!({ "event": "message" });
        assert!(serde_json::from_value::<ClientEvent>(raw).is_err());
    }

    // ==========================================================================
    // Payload validation
    // ==========================================================================

    #[test]
    fn test_message_payload_rejects_empty_content() {
        let payload = SendMessagePayload {
            server_id: "1".into(),
            channel_id: "general".into(),
            content: String::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_message_payload_content_upper_bound() {
        let mut payload = SendMessagePayload {
            server_id: "1".into(),
            channel_id: "general".into(),
            content: "a".repeat(2000),
        };
        assert!(payload.validate().is_ok());

        payload.content = "a".repeat(2001);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_dm_payload_rejects_empty_content() {
        let payload = SendDmPayload {
            dm_id: "77".into(),
            content: String::new(),
        };
        assert!(payload.validate().is_err());
    }

    // ==========================================================================
    // Outbound encoding
    // ==========================================================================

    #[test]
    fn test_message_broadcast_wire_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let event = ServerEvent::Message(MessageBroadcast {
            server_id: "1".into(),
            channel_id: "general".into(),
            message: WireMessage {
                id: "10".into(),
                content: "hi".into(),
                timestamp: ts,
                author: Some(UserProfile {
                    id: "42".into(),
                    username: "kim".into(),
                    avatar: None,
                }),
            },
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "message");
        assert_eq!(value["data"]["serverId"], "1");
        assert_eq!(value["data"]["channelId"], "general");
        assert_eq!(value["data"]["message"]["id"], "10");
        assert_eq!(value["data"]["message"]["author"]["username"], "kim");
        assert_eq!(value["data"]["message"]["author"]["avatar"], Value::Null);
        assert!(value["data"]["message"]["timestamp"].is_string());
    }

    #[test]
    fn test_incoming_call_serializes_null_profile() {
        let event = ServerEvent::IncomingCall(IncomingCallPayload {
            from: None,
            call_type: CallKind::Voice,
            call_id: "abc".into(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "incoming-call");
        assert_eq!(value["data"]["from"], Value::Null);
        assert_eq!(value["data"]["type"], "voice");
        assert_eq!(value["data"]["callId"], "abc");
    }

    #[test]
    fn test_call_ended_wire_shape() {
        let event = ServerEvent::CallEnded(CallPeerPayload { from: "42".into() });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({ "event": "call-ended", "data": { "from": "42" } })
        );
    }

    #[test]
    fn test_ice_candidate_forwards_payload_verbatim() {
        let candidate = json!({
            "candidate": "candidate:0 1 UDP 2122252543 192.0.2.1 54321 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        });
        let event = ServerEvent::IceCandidate(IceCandidateBroadcast {
            candidate: candidate.clone(),
            from: "42".into(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "ice-candidate");
        assert_eq!(value["data"]["candidate"], candidate);
        assert_eq!(value["data"]["from"], "42");
    }

    #[test]
    fn test_error_event_wire_shape() {
        let event = ServerEvent::Error(ErrorPayload {
            message: "Not authenticated".into(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({ "event": "error", "data": { "message": "Not authenticated" } })
        );
    }

    #[test]
    fn test_friend_accepted_wire_shape() {
        let event = ServerEvent::FriendAccepted(FriendAcceptedPayload {
            user_id: "42".into(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({ "event": "friend-accepted", "data": { "userId": "42" } })
        );
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    #[test]
    fn test_parse_id_accepts_snowflakes() {
        assert_eq!(parse_id("serverId", "123456").unwrap(), 123456);
    }

    #[test]
    fn test_parse_id_names_the_field() {
        let err = parse_id("serverId", "abc").unwrap_err();
        assert!(err.to_string().contains("serverId"));
    }

    #[test]
    fn test_profile_snapshot_from_user() {
        let user = User {
            id: 42,
            username: "kim".into(),
            avatar: Some("https://cdn.example/a.png".into()),
            created_at: Utc::now(),
        };

        let profile = UserProfile::from(&user);
        assert_eq!(profile.id, "42");
        assert_eq!(profile.username, "kim");
        assert_eq!(profile.avatar.as_deref(), Some("https://cdn.example/a.png"));
    }
}
