//! Real-time relay over WebSocket.
//!
//! The pieces, leaves first: the wire protocol ([`events`]), the error
//! taxonomy ([`error`]), the connection/room registry ([`registry`]),
//! the relay service and its dispatch loop ([`relay`]), message
//! fan-out ([`fanout`]), call signaling ([`signaling`]), friend
//! notification hooks ([`presence`]), and the socket endpoint
//! ([`handler`]).

pub mod error;
pub mod events;
mod fanout;
pub mod handler;
mod presence;
pub mod registry;
pub mod relay;
mod signaling;

pub use error::RelayError;
pub use events::{ClientEvent, ServerEvent};
pub use handler::ws_handler;
pub use registry::{ConnectionId, ConnectionRegistry, Room};
pub use relay::Relay;
