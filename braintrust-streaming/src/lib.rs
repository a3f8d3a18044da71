//! # braintrust-streaming
//!
//! Streaming support for braintrust.
//!
//! This crate turns the server-sent events produced by Braintrust function
//! invocations into typed chunks, lets several consumers read the same
//! one-time stream, and reduces a drained stream to its final value.
//!
//! ## Core Concepts
//!
//! - **[`BraintrustStream`]**: A chunk stream with `copy` and a memoized `final_value`
//! - **[`SseParser`]**: Parse Server-Sent Events from HTTP responses
//! - **[`ChunkDecoder`]**: Validate events and turn them into [`StreamChunk`]s
//! - **[`FinalValueReducer`]**: Fold chunks into a [`FinalValue`]
//! - **[`tee`]**: Split a single-pass stream into two readers
//!
//! ## Example - Live output plus final value
//!
//! ```ignore
//! use braintrust_streaming::BraintrustStream;
//! use futures::StreamExt;
//!
//! let mut stream = BraintrustStream::from_sse(response.bytes_stream());
//! let mut live = stream.copy();
//!
//! while let Some(chunk) = live.next().await {
//!     print!("{}", chunk?.data());
//! }
//!
//! let value = stream.final_value().await?;
//! ```
//!
//! ## Example - SSE Parsing
//!
//! ```ignore
//! use braintrust_streaming::{decode_event, DecodedEvent, SseParser};
//!
//! let mut parser = SseParser::new();
//! parser.feed_str("event: text_delta\ndata: \"hello\"\n\n")?;
//!
//! while let Some(event) = parser.next_event() {
//!     if let DecodedEvent::Chunk(chunk) = decode_event(&event)? {
//!         println!("{}", chunk.data());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod reducer;
pub mod sse;
pub mod stream;
pub mod tee;

// Re-exports
pub use braintrust_core::{ChunkKind, EventValidationError, FinalValue, StreamChunk};
pub use config::{StreamConfig, DEFAULT_MAX_BUFFER_SIZE};
pub use decoder::{decode_event, ChunkDecoder, DecodedEvent};
pub use error::{StreamError, StreamResult};
pub use reducer::{
    reduce_stream, FinalValueCallback, FinalValuePassThrough, FinalValueReducer, ReducibleChunk,
};
pub use sse::{SseEvent, SseInput, SseParser, SseStream};
pub use stream::{BraintrustStream, ChunkStream};
pub use tee::{tee, TeeBranch};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        reduce_stream, BraintrustStream, FinalValue, FinalValuePassThrough, SseEvent, SseParser,
        StreamChunk, StreamConfig, StreamError, StreamResult,
    };
}
