//! Error types for braintrust-core.

use thiserror::Error;

/// A wire event failed structural validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// The event carried data but no event name.
    #[error("Event has data but no event name")]
    MissingEventName,

    /// The event name is not one of the recognized kinds.
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    /// The event payload does not fit its kind.
    #[error("Unexpected payload for {event} event: {data:?}")]
    UnexpectedPayload {
        /// Event name.
        event: String,
        /// The offending payload.
        data: String,
    },
}

impl EventValidationError {
    /// Create an unknown event error.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownEvent(name.into())
    }

    /// Create an unexpected payload error.
    pub fn unexpected_payload(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self::UnexpectedPayload {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Result type for event validation.
pub type ValidationResult<T> = std::result::Result<T, EventValidationError>;
