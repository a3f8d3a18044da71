//! # braintrust
//!
//! Rust client for invoking Braintrust functions and consuming their
//! streamed output.
//!
//! A streamed invocation returns a [`BraintrustStream`]: a sequence of text
//! and JSON deltas that can be read live, copied for a second reader, and
//! reduced to a single [`FinalValue`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use braintrust::prelude::*;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BraintrustClient::from_env()?;
//!     let request = InvokeRequest::new(FunctionRef::slug("my-project", "greet"), "Ada");
//!
//!     let mut stream = client.invoke_stream(request).await?;
//!     let mut live = stream.copy();
//!     while let Some(chunk) = live.next().await {
//!         print!("{}", chunk?.data());
//!     }
//!
//!     println!("\nfinal: {:?}", stream.final_value().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`braintrust_core`]: chunks, final values and event validation
//! - [`braintrust_streaming`]: SSE parsing, decoding, copying and reduction
//! - this crate: configuration, the invoke client and tracing setup

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod telemetry;

pub use braintrust_core::{
    validate_event, ChunkKind, EventValidationError, FinalValue, StreamChunk, StreamEventKind,
};
pub use braintrust_streaming::{
    reduce_stream, tee, BraintrustStream, ChunkDecoder, FinalValuePassThrough, FinalValueReducer,
    SseEvent, SseParser, SseStream, StreamConfig, StreamError, StreamResult,
};
pub use client::{BraintrustClient, FunctionRef, InvokeMode, InvokeRequest};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::stream_from_response;
pub use telemetry::{init_tracing, LogFormat};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BraintrustClient, BraintrustStream, ClientConfig, ClientError, ClientResult, FinalValue,
        FunctionRef, InvokeRequest, StreamChunk, StreamConfig, StreamError, StreamResult,
    };
}
