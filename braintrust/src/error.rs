//! Client errors.

use braintrust_streaming::StreamError;
use thiserror::Error;

/// Errors returned by [`BraintrustClient`](crate::BraintrustClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response stream failed to decode.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// A request or response body failed to (de)serialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an API error.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API rejected the credentials.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ClientError::api(404, "function not found");
        assert_eq!(err.to_string(), "API error 404: function not found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_auth_error());
    }

    #[test]
    fn test_auth_classification() {
        assert!(ClientError::api(401, "").is_auth_error());
        assert!(ClientError::api(403, "").is_auth_error());
        assert!(!ClientError::configuration("missing key").is_auth_error());
    }

    #[test]
    fn test_from_stream_error() {
        let err: ClientError = StreamError::Interrupted.into();
        assert!(matches!(err, ClientError::Stream(StreamError::Interrupted)));
        assert_eq!(err.status(), None);
    }
}
