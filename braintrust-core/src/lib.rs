//! # braintrust-core
//!
//! Core types shared by the braintrust crates.
//!
//! - **Chunks**: the typed deltas a Braintrust stream is made of
//! - **Final values**: what a fully drained stream reduces to
//! - **Events**: the wire event names and their validation rules
//! - **Errors**: validation errors for wire events
//!
//! ## Example
//!
//! ```rust
//! use braintrust_core::{FinalValue, StreamChunk};
//!
//! let chunks = vec![StreamChunk::text("Hello, "), StreamChunk::text("world")];
//! let text: String = chunks.iter().map(StreamChunk::data).collect();
//!
//! assert_eq!(FinalValue::Text(text).as_text(), Some("Hello, world"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod chunk;
pub mod errors;
pub mod events;
pub mod value;

pub use chunk::{ChunkKind, StreamChunk};
pub use errors::{EventValidationError, ValidationResult};
pub use events::{validate_event, StreamEventKind};
pub use value::FinalValue;

/// Prelude module for common imports.
///
/// ```rust
/// use braintrust_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::chunk::{ChunkKind, StreamChunk};
    pub use crate::errors::{EventValidationError, ValidationResult};
    pub use crate::events::{validate_event, StreamEventKind};
    pub use crate::value::FinalValue;
}
