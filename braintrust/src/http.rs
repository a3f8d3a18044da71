//! Adapting HTTP responses into Braintrust streams.

use braintrust_streaming::{BraintrustStream, StreamConfig, StreamError};
use futures::TryStreamExt;
use reqwest::Response;
use tracing::debug;

/// Wrap a streaming HTTP response body in a [`BraintrustStream`].
///
/// The response status is not checked here.
pub fn stream_from_response(response: Response, config: &StreamConfig) -> BraintrustStream {
    debug!(
        status = response.status().as_u16(),
        content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
        "streaming response body"
    );
    let body = response.bytes_stream().map_err(StreamError::transport);
    BraintrustStream::from_sse_with_config(body, config)
}
