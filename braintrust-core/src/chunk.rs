//! Stream chunk types.
//!
//! A Braintrust stream is a sequence of [`StreamChunk`]s. Text chunks carry
//! pieces of free-form output; JSON chunks carry raw fragments of a single
//! JSON document that is only valid once every fragment has been joined.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One typed unit of streamed output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Incremental piece of text output.
    TextDelta {
        /// The text fragment, already unquoted.
        data: String,
    },
    /// Incremental piece of a JSON-encoded value.
    JsonDelta {
        /// Raw JSON fragment. Not valid JSON on its own in general.
        data: String,
    },
}

impl StreamChunk {
    /// Create a text delta chunk.
    pub fn text(data: impl Into<String>) -> Self {
        Self::TextDelta { data: data.into() }
    }

    /// Create a JSON delta chunk.
    pub fn json(data: impl Into<String>) -> Self {
        Self::JsonDelta { data: data.into() }
    }

    /// The kind of this chunk.
    #[must_use]
    pub fn kind(&self) -> ChunkKind {
        match self {
            Self::TextDelta { .. } => ChunkKind::TextDelta,
            Self::JsonDelta { .. } => ChunkKind::JsonDelta,
        }
    }

    /// The chunk payload.
    #[must_use]
    pub fn data(&self) -> &str {
        match self {
            Self::TextDelta { data } | Self::JsonDelta { data } => data,
        }
    }

    /// Consume the chunk and return its payload.
    #[must_use]
    pub fn into_data(self) -> String {
        match self {
            Self::TextDelta { data } | Self::JsonDelta { data } => data,
        }
    }

    /// Whether this is a text delta.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::TextDelta { .. })
    }

    /// Whether this is a JSON delta.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::JsonDelta { .. })
    }
}

/// Discriminant of a [`StreamChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// A [`StreamChunk::TextDelta`].
    TextDelta,
    /// A [`StreamChunk::JsonDelta`].
    JsonDelta,
}

impl ChunkKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextDelta => "text_delta",
            Self::JsonDelta => "json_delta",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_serializes_with_type_tag() {
        let json = serde_json::to_value(StreamChunk::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text_delta", "data": "hi"}));

        let json = serde_json::to_value(StreamChunk::json("{\"a\":")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "json_delta", "data": "{\"a\":"})
        );
    }

    #[test]
    fn test_chunk_deserializes_from_tagged_object() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"type":"json_delta","data":"1}"}"#).unwrap();
        assert_eq!(chunk, StreamChunk::json("1}"));
        assert!(chunk.is_json());
        assert!(!chunk.is_text());
    }

    #[test]
    fn test_chunk_accessors() {
        let chunk = StreamChunk::text("abc");
        assert_eq!(chunk.kind(), ChunkKind::TextDelta);
        assert_eq!(chunk.data(), "abc");
        assert_eq!(chunk.into_data(), "abc");
        assert_eq!(ChunkKind::JsonDelta.to_string(), "json_delta");
    }
}
