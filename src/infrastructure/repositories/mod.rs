//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Profile snapshot lookups
//! - **MessageRepository** - Channel message persistence and history
//! - **DmRepository** - DM conversations and their messages
//! - **MembershipRepository** - Authoritative server membership reads
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{
//!     PgDmRepository, PgMembershipRepository, PgMessageRepository,
//!     PgUserRepository,
//! };
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let message_repo = PgMessageRepository::new(pool.clone());
//!     let dm_repo = PgDmRepository::new(pool.clone());
//!     let membership_repo = PgMembershipRepository::new(pool.clone());
//! }
//! ```

pub mod dm_repository;
pub mod membership_repository;
pub mod message_repository;
pub mod user_repository;

// Re-export repository structs for convenience
pub use dm_repository::PgDmRepository;
pub use membership_repository::PgMembershipRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
