//! Relay error taxonomy.
//!
//! Every failure while handling an inbound event converts into exactly
//! one directed `error` event to the offending connection; the
//! connection itself stays open and the process never terminates over
//! a handler failure. An unreachable signaling target is not an error
//! and has no variant here (the event is dropped silently).

use validator::ValidationErrors;

use crate::shared::validation;

use super::events::{ErrorPayload, ServerEvent};

/// Failure modes of inbound event handling.
///
/// The `Display` text is exactly what the sender sees in the `error`
/// event; store-level detail stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The connection acted before binding an identity with `join`.
    #[error("User not authenticated")]
    Unauthenticated,

    /// Malformed payload: empty content, length bound exceeded,
    /// unparseable id, unrecognized event.
    #[error("{0}")]
    Validation(String),

    /// The referenced server or conversation is absent, or not
    /// accessible to the sender (indistinguishably).
    #[error("{0}")]
    NotFound(String),

    /// The store rejected or failed an operation.
    #[error("{0}")]
    Persistence(String),
}

impl RelayError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Unauthenticated => "unauthenticated",
            RelayError::Validation(_) => "validation",
            RelayError::NotFound(_) => "not_found",
            RelayError::Persistence(_) => "persistence",
        }
    }

    /// The directed `error` event reported to the offending sender.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error(ErrorPayload {
            message: self.to_string(),
        })
    }
}

impl From<ValidationErrors> for RelayError {
    fn from(errors: ValidationErrors) -> Self {
        RelayError::Validation(validation::first_message(&errors))
    }
}
