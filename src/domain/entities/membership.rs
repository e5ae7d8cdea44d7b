//! Server membership read model.
//!
//! Maps to the `server_members` table. Membership writes (joining and
//! leaving servers) belong to the REST layer; the relay only consults
//! the authoritative record when a connection joins.

use async_trait::async_trait;

use crate::shared::error::AppError;

/// Repository trait for membership lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// All server ids the user currently belongs to.
    async fn server_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError>;
}
