//! Streaming errors.

use braintrust_core::EventValidationError;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while decoding or reducing a stream.
///
/// Errors are cloneable: a failure is delivered to every branch of a copied
/// stream and cached by the memoized final value.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Malformed SSE framing or encoding.
    #[error("Failed to parse SSE event: {0}")]
    ParseSse(String),

    /// Event failed schema validation.
    #[error("Invalid stream event: {0}")]
    InvalidEvent(#[from] EventValidationError),

    /// A text delta payload was not a JSON string.
    #[error("Invalid text delta payload {data:?}: {reason}")]
    InvalidTextDelta {
        /// The raw payload.
        data: String,
        /// Why it failed to decode.
        reason: String,
    },

    /// The concatenated JSON deltas did not parse.
    #[error("Failed to parse final JSON value: {0}")]
    FinalValueParse(String),

    /// The SSE buffer grew past its limit.
    #[error("SSE buffer exceeded {limit} bytes")]
    BufferOverflow {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// IO error from the source.
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    /// Transport error from the source.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The stream was dropped before it finished.
    #[error("Stream interrupted")]
    Interrupted,

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Whether this error came from decoding the wire format.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::ParseSse(_)
                | Self::InvalidEvent(_)
                | Self::InvalidTextDelta { .. }
                | Self::BufferOverflow { .. }
        )
    }

    /// Create a transport error from any displayable error.
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create from any error.
    pub fn from_err<E: std::fmt::Display>(err: E) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<Infallible> for StreamError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
