//! # Domain Entities
//!
//! Core domain entities for the relay's slice of the chat system.
//! All entities map directly to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: User account profile (read-only here)
//! - **ChatMessage**: A text message sent to a server channel
//! - **DmConversation / DmMessage**: Direct messages between two users
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. These traits are implemented in the infrastructure
//! layer, following the dependency inversion principle; the relay
//! receives them as trait objects so tests can substitute mocks.

mod dm;
mod membership;
mod message;
mod user;

// Re-export User entity and related types
pub use user::{User, UserRepository};

// Re-export chat message entity and related types
pub use message::{ChatMessage, MessageRepository};

// Re-export DM entities and related types
pub use dm::{DmConversation, DmMessage, DmRepository};

// Re-export membership read model
pub use membership::MembershipRepository;

// Generated repository mocks, for relay tests
#[cfg(test)]
pub use dm::MockDmRepository;
#[cfg(test)]
pub use membership::MockMembershipRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;
