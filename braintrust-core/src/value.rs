//! Final values of drained streams.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// The single aggregated result of a fully drained stream.
///
/// A stream that carried any JSON delta reduces to [`FinalValue::Json`];
/// otherwise one that carried any text delta reduces to
/// [`FinalValue::Text`]; a stream with neither reduces to
/// [`FinalValue::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FinalValue {
    /// No text or JSON chunks were observed.
    #[default]
    Empty,
    /// Concatenated text deltas, in arrival order.
    Text(String),
    /// Parsed concatenation of the JSON deltas.
    Json(JsonValue),
}

impl FinalValue {
    /// Whether no chunks were observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The text value, if this is [`FinalValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The JSON value, if this is [`FinalValue::Json`].
    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a plain JSON value.
    ///
    /// Text becomes a JSON string and `Empty` becomes `null`.
    #[must_use]
    pub fn into_json(self) -> JsonValue {
        match self {
            Self::Empty => JsonValue::Null,
            Self::Text(text) => JsonValue::String(text),
            Self::Json(value) => value,
        }
    }

    /// Deserialize the value into a typed output.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_json())
    }
}

impl From<String> for FinalValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<JsonValue> for FinalValue {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}
