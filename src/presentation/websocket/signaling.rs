//! Call signaling relay.
//!
//! Store-and-forward of call lifecycle and WebRTC negotiation events
//! between two users. The relay holds no call state: every operation
//! resolves the target's live connections, forwards the payload with
//! the sender's identity attached, and forgets. An offline target
//! means a silent drop; unlike chat messages, the sender is never told
//! a signaling event went nowhere, because queuing a call event for an
//! absent peer is meaningless.
//!
//! SDP offers/answers and ICE candidates pass through as opaque JSON.

use tracing::debug;

use crate::infrastructure::metrics;

use super::error::RelayError;
use super::events::{
    parse_id, CallAnswerBroadcast, CallAnswerPayload, CallInitiatePayload, CallOfferBroadcast,
    CallOfferPayload, CallPeerPayload, CallTargetPayload, IceCandidateBroadcast,
    IceCandidatePayload, IncomingCallPayload, ServerEvent,
};
use super::registry::ConnectionId;
use super::relay::Relay;

impl Relay {
    /// `call-initiate`: ring every device of the callee, with the
    /// caller's profile snapshot attached. The call id is the calling
    /// connection's id; the clients echo it for the rest of the call.
    pub(super) async fn handle_call_initiate(
        &self,
        conn: ConnectionId,
        payload: CallInitiatePayload,
    ) -> Result<(), RelayError> {
        let caller_id = self.require_identity(conn)?;
        let to = parse_id("to", &payload.to)?;

        // Snapshot failures are logged inside; a store error drops the
        // ring rather than surfacing an error the caller cannot act on
        let from = match self.profile_snapshot(caller_id).await {
            Ok(profile) => profile,
            Err(_) => return Ok(()),
        };

        self.forward(
            "call-initiate",
            to,
            ServerEvent::IncomingCall(IncomingCallPayload {
                from,
                call_type: payload.call_type,
                call_id: conn.to_string(),
            }),
        );
        Ok(())
    }

    pub(super) fn handle_call_accept(
        &self,
        conn: ConnectionId,
        payload: CallTargetPayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "call-accept",
            to,
            ServerEvent::CallAccepted(CallPeerPayload { from }),
        );
        Ok(())
    }

    pub(super) fn handle_call_decline(
        &self,
        conn: ConnectionId,
        payload: CallTargetPayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "call-decline",
            to,
            ServerEvent::CallDeclined(CallPeerPayload { from }),
        );
        Ok(())
    }

    pub(super) fn handle_call_end(
        &self,
        conn: ConnectionId,
        payload: CallTargetPayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "call-end",
            to,
            ServerEvent::CallEnded(CallPeerPayload { from }),
        );
        Ok(())
    }

    /// `call-offer`: SDP offer, forwarded verbatim.
    pub(super) fn handle_call_offer(
        &self,
        conn: ConnectionId,
        payload: CallOfferPayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "call-offer",
            to,
            ServerEvent::CallOffer(CallOfferBroadcast {
                offer: payload.offer,
                from,
            }),
        );
        Ok(())
    }

    /// `call-answer`: SDP answer, forwarded verbatim.
    pub(super) fn handle_call_answer(
        &self,
        conn: ConnectionId,
        payload: CallAnswerPayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "call-answer",
            to,
            ServerEvent::CallAnswer(CallAnswerBroadcast {
                answer: payload.answer,
                from,
            }),
        );
        Ok(())
    }

    /// `ice-candidate`: forwarded verbatim.
    pub(super) fn handle_ice_candidate(
        &self,
        conn: ConnectionId,
        payload: IceCandidatePayload,
    ) -> Result<(), RelayError> {
        let (to, from) = self.peer_pair(conn, &payload.to)?;
        self.forward(
            "ice-candidate",
            to,
            ServerEvent::IceCandidate(IceCandidateBroadcast {
                candidate: payload.candidate,
                from,
            }),
        );
        Ok(())
    }

    /// Authenticate the sender and parse the target, yielding the
    /// target id and the sender's wire identity.
    fn peer_pair(&self, conn: ConnectionId, to: &str) -> Result<(i64, String), RelayError> {
        let sender = self.require_identity(conn)?;
        let to = parse_id("to", to)?;
        Ok((to, sender.to_string()))
    }

    /// Deliver to every device of the target; drop silently when none.
    fn forward(&self, event_name: &str, to: i64, event: ServerEvent) {
        let reached = self.registry().send_to_user(to, &event);
        if reached == 0 {
            debug!(event = event_name, to, "signaling target offline; dropped");
            metrics::record_signaling_drop(event_name);
        }
    }
}
