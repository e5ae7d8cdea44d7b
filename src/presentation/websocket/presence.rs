//! Friend notification hooks.
//!
//! Called by the REST layer after it has already persisted the friend
//! request or acceptance; the relay only pushes a best-effort notice to
//! the target's live devices. Offline targets and failed profile
//! lookups drop the notice. There is no queue and no retry: an offline
//! user picks the change up from their next full state load.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::events::{FriendAcceptedPayload, FriendRequestPayload, ServerEvent};
use super::relay::Relay;

impl Relay {
    /// Push a `friend-request` notice to every device of `to_user`.
    pub async fn notify_friend_request(
        &self,
        to_user: i64,
        request_id: i64,
        from_user: i64,
        created_at: DateTime<Utc>,
    ) {
        let from = match self.profile_snapshot(from_user).await {
            Ok(profile) => profile,
            // Already logged; the recipient sees it on next reload
            Err(_) => return,
        };

        let reached = self.registry().send_to_user(
            to_user,
            &ServerEvent::FriendRequest(FriendRequestPayload {
                id: request_id.to_string(),
                from,
                created_at,
            }),
        );
        if reached == 0 {
            debug!(to_user, request_id, "friend request notice dropped; user offline");
        }
    }

    /// Push a `friend-accepted` notice to every device of `to_user`.
    pub fn notify_friend_accepted(&self, to_user: i64, by_user: i64) {
        let reached = self.registry().send_to_user(
            to_user,
            &ServerEvent::FriendAccepted(FriendAcceptedPayload {
                user_id: by_user.to_string(),
            }),
        );
        if reached == 0 {
            debug!(to_user, by_user, "friend accepted notice dropped; user offline");
        }
    }
}
