//! Wire event kinds and their validation.
//!
//! Braintrust streams are transported as server-sent events whose names
//! identify the payload kind. This module is the schema the decoder checks
//! every event against before interpreting it.

use crate::chunk::ChunkKind;
use crate::errors::{EventValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recognized wire event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    /// Data is a JSON-quoted string fragment.
    TextDelta,
    /// Data is a raw fragment of a JSON document.
    JsonDelta,
    /// Terminal marker with an empty payload.
    Done,
}

impl StreamEventKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextDelta => "text_delta",
            Self::JsonDelta => "json_delta",
            Self::Done => "done",
        }
    }

    /// The chunk kind this event produces, if any.
    #[must_use]
    pub fn chunk_kind(self) -> Option<ChunkKind> {
        match self {
            Self::TextDelta => Some(ChunkKind::TextDelta),
            Self::JsonDelta => Some(ChunkKind::JsonDelta),
            Self::Done => None,
        }
    }
}

impl From<ChunkKind> for StreamEventKind {
    fn from(kind: ChunkKind) -> Self {
        match kind {
            ChunkKind::TextDelta => Self::TextDelta,
            ChunkKind::JsonDelta => Self::JsonDelta,
        }
    }
}

impl fmt::Display for StreamEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamEventKind {
    type Err = EventValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text_delta" => Ok(Self::TextDelta),
            "json_delta" => Ok(Self::JsonDelta),
            "done" => Ok(Self::Done),
            other => Err(EventValidationError::unknown(other)),
        }
    }
}

/// Validate the shape of a wire event.
///
/// Returns the event kind when `name` is recognized and `data` fits it.
/// Payload contents of delta events are not inspected here; a `done` event
/// must carry an empty payload.
pub fn validate_event(name: Option<&str>, data: &str) -> ValidationResult<StreamEventKind> {
    let Some(name) = name else {
        return Err(EventValidationError::MissingEventName);
    };

    let kind: StreamEventKind = name.parse()?;
    if kind == StreamEventKind::Done && !data.trim().is_empty() {
        return Err(EventValidationError::unexpected_payload(name, data));
    }

    Ok(kind)
}
