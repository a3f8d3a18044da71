//! Stream configuration.

use serde::{Deserialize, Serialize};

/// Default cap on buffered, not yet framed SSE text.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for decoding a Braintrust stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum bytes the SSE parser buffers while waiting for a line break.
    pub max_buffer_size: usize,
    /// Stop decoding once a `done` event arrives.
    pub stop_at_done: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            stop_at_done: true,
        }
    }
}

impl StreamConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SSE buffer limit.
    #[must_use]
    pub fn max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    /// Set whether decoding stops at `done`.
    #[must_use]
    pub fn stop_at_done(mut self, stop: bool) -> Self {
        self.stop_at_done = stop;
        self
    }
}
