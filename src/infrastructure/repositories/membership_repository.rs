//! Membership Repository Implementation
//!
//! PostgreSQL reads against the `server_members` table. Used at join
//! time to check a connection's asserted server list against the
//! authoritative record.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::MembershipRepository;
use crate::shared::error::AppError;

/// PostgreSQL membership repository implementation.
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Creates a new PgMembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    /// All server ids the user currently belongs to.
    async fn server_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT server_id
            FROM server_members
            WHERE user_id = $1
            ORDER BY server_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
