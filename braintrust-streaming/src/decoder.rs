//! Decoding SSE events into stream chunks.

use crate::error::{StreamError, StreamResult};
use crate::sse::SseEvent;
use braintrust_core::{validate_event, StreamChunk, StreamEventKind};
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

/// Result of interpreting one wire event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// The event carried a chunk.
    Chunk(StreamChunk),
    /// The terminal `done` marker.
    Done,
    /// A transport-level event with nothing to emit.
    Ignored,
}

/// Interpret a single SSE event.
///
/// `text_delta` payloads are JSON strings and are unquoted here;
/// `json_delta` payloads are passed through untouched.
pub fn decode_event(event: &SseEvent) -> StreamResult<DecodedEvent> {
    if event.is_transport_only() {
        return Ok(DecodedEvent::Ignored);
    }

    let kind = validate_event(event.event.as_deref(), &event.data)?;
    match kind {
        StreamEventKind::TextDelta => {
            let text: String = serde_json::from_str(&event.data).map_err(|e| {
                StreamError::InvalidTextDelta {
                    data: event.data.clone(),
                    reason: e.to_string(),
                }
            })?;
            Ok(DecodedEvent::Chunk(StreamChunk::text(text)))
        }
        StreamEventKind::JsonDelta => Ok(DecodedEvent::Chunk(StreamChunk::json(
            event.data.clone(),
        ))),
        StreamEventKind::Done => Ok(DecodedEvent::Done),
    }
}

pin_project! {
    /// Stream adapter that turns SSE events into [`StreamChunk`]s.
    ///
    /// The first error ends the stream.
    pub struct ChunkDecoder<S> {
        #[pin]
        inner: S,
        stop_at_done: bool,
        saw_done: bool,
        finished: bool,
    }
}

impl<S> ChunkDecoder<S> {
    /// Create a decoder that stops at the `done` event.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stop_at_done: true,
            saw_done: false,
            finished: false,
        }
    }

    /// Set whether decoding stops at the `done` event.
    #[must_use]
    pub fn stop_at_done(mut self, stop: bool) -> Self {
        self.stop_at_done = stop;
        self
    }

    /// Whether a `done` event has been seen.
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }
}

impl<S> Stream for ChunkDecoder<S>
where
    S: Stream<Item = StreamResult<SseEvent>>,
{
    type Item = StreamResult<StreamChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(event)) => match decode_event(&event) {
                    Ok(DecodedEvent::Chunk(chunk)) => {
                        trace!(kind = %chunk.kind(), len = chunk.data().len(), "decoded chunk");
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Ok(DecodedEvent::Done) => {
                        debug!("received done event");
                        *this.saw_done = true;
                        if *this.stop_at_done {
                            *this.finished = true;
                            return Poll::Ready(None);
                        }
                    }
                    Ok(DecodedEvent::Ignored) => {
                        trace!(retry = ?event.retry, id = ?event.id, "skipping transport event");
                    }
                    Err(error) => {
                        warn!(
                            event = ?event.event,
                            error = %error,
                            "failed to decode stream event"
                        );
                        *this.finished = true;
                        return Poll::Ready(Some(Err(error)));
                    }
                },
                Some(Err(error)) => {
                    warn!(error = %error, "stream source failed");
                    *this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                None => {
                    if !*this.saw_done {
                        debug!("stream ended without a done event");
                    }
                    *this.finished = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}
