//! Shared Utilities
//!
//! Errors, snowflake id generation, and validation helpers used across
//! the layers.

pub mod error;
pub mod snowflake;
pub mod validation;
