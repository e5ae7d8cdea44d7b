//! Presentation Layer
//!
//! The WebSocket relay and the small HTTP surface around it.

pub mod http;
pub mod middleware;
pub mod websocket;
