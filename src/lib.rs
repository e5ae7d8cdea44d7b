//! # Chat Relay Library
//!
//! The real-time core of a Discord-like chat application:
//! - WebSocket gateway with room-based message fan-out
//! - Direct messages delivered to every device of both participants
//! - WebRTC call signaling relayed verbatim between peers
//! - Best-effort friend notification push
//! - PostgreSQL for message persistence
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core entities and repository traits
//! - **Infrastructure Layer**: Database repositories and metrics
//! - **Presentation Layer**: HTTP endpoints and the WebSocket relay
//!
//! ## Module Structure
//!
//! ```text
//! chat_relay/
//! +-- config/        Configuration management
//! +-- domain/        Domain entities and repository traits
//! +-- infrastructure/ Database repositories and Prometheus metrics
//! +-- presentation/  HTTP routes and the WebSocket relay
//! +-- shared/        Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business records
pub mod domain;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP endpoints and WebSocket relay
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
