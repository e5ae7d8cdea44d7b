//! # Configuration Module
//!
//! Layered runtime settings for the relay: listen address, database
//! pool sizing, websocket frame limits and the ping/pong heartbeat
//! windows, CORS origins, and the snowflake machine id. Sources, in
//! override order:
//! - config/default.toml, then config/{environment}.toml
//! - Environment variables prefixed with APP__ (and `DATABASE_URL`)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_relay::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Relay listening on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
