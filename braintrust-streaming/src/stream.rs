//! The Braintrust stream.
//!
//! [`BraintrustStream`] wraps a one-time sequence of [`StreamChunk`]s with
//! helpers to copy it and to reduce it to its final value.

use crate::config::StreamConfig;
use crate::decoder::ChunkDecoder;
use crate::error::{StreamError, StreamResult};
use crate::reducer::FinalValueReducer;
use crate::sse::{SseEvent, SseInput, SseStream};
use crate::tee::tee;
use braintrust_core::{FinalValue, StreamChunk};
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{ready, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Boxed sequence of decoded chunks.
pub type ChunkStream = BoxStream<'static, StreamResult<StreamChunk>>;

/// A stream of [`StreamChunk`]s with a memoized final value.
///
/// Reading the stream (directly or through [`final_value`](Self::final_value))
/// consumes it. Use [`copy`](Self::copy) first to read it more than once.
///
/// ```ignore
/// use braintrust_streaming::BraintrustStream;
/// use futures::StreamExt;
///
/// let mut stream = BraintrustStream::from_sse(response.bytes_stream());
/// let mut live = stream.copy();
///
/// while let Some(chunk) = live.next().await {
///     print!("{}", chunk?.data());
/// }
/// let value = stream.final_value().await?;
/// ```
pub struct BraintrustStream {
    // `None` once drained or failed.
    source: Option<ChunkStream>,
    reducer: FinalValueReducer,
    outcome: Option<StreamResult<FinalValue>>,
}

impl BraintrustStream {
    /// Create a stream over already decoded chunks.
    pub fn from_chunks<S>(chunks: S) -> Self
    where
        S: Stream<Item = StreamResult<StreamChunk>> + Send + 'static,
    {
        Self {
            source: Some(chunks.boxed()),
            reducer: FinalValueReducer::new(),
            outcome: None,
        }
    }

    /// Create a stream over a fixed list of chunks.
    pub fn from_chunk_list(chunks: impl IntoIterator<Item = StreamChunk>) -> Self {
        let chunks: Vec<_> = chunks.into_iter().map(Ok).collect();
        Self::from_chunks(stream::iter(chunks))
    }

    /// Create a stream over pre-parsed SSE events.
    pub fn from_events<S>(events: S) -> Self
    where
        S: Stream<Item = StreamResult<SseEvent>> + Send + 'static,
    {
        Self::from_events_with_config(events, &StreamConfig::default())
    }

    /// Create a stream over pre-parsed SSE events with a custom configuration.
    pub fn from_events_with_config<S>(events: S, config: &StreamConfig) -> Self
    where
        S: Stream<Item = StreamResult<SseEvent>> + Send + 'static,
    {
        Self::from_chunks(ChunkDecoder::new(events).stop_at_done(config.stop_at_done))
    }

    /// Create a stream over raw SSE bytes or text.
    pub fn from_sse<S, T, E>(source: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: SseInput + Send + 'static,
        E: Into<StreamError> + Send + 'static,
    {
        Self::from_sse_with_config(source, &StreamConfig::default())
    }

    /// Create a stream over raw SSE bytes or text with a custom configuration.
    pub fn from_sse_with_config<S, T, E>(source: S, config: &StreamConfig) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: SseInput + Send + 'static,
        E: Into<StreamError> + Send + 'static,
    {
        let events = SseStream::with_max_buffer_size(source, config.max_buffer_size);
        Self::from_events_with_config(events, config)
    }

    /// Split off an independent copy of the remaining stream.
    ///
    /// Both handles yield the same chunks in the same order. Call this before
    /// reading: chunks already read through `self` are not replayed into the
    /// copy.
    pub fn copy(&mut self) -> Self {
        match self.source.take() {
            Some(source) => {
                let (kept, copied) = tee(source);
                self.source = Some(kept.boxed());
                Self::from_chunks(copied)
            }
            None => Self {
                source: None,
                reducer: FinalValueReducer::new(),
                outcome: self.outcome.clone(),
            },
        }
    }

    /// Drain the stream and return its final value.
    ///
    /// The outcome is memoized: later calls return it without reading the
    /// source again. Chunks already read directly from the stream are
    /// included. Dropping the returned future part way leaves the stream
    /// resumable.
    pub async fn final_value(&mut self) -> StreamResult<FinalValue> {
        while self.next().await.is_some() {}

        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => Err(StreamError::InvalidState(
                "stream drained without a final value".to_string(),
            )),
        }
    }

    /// Whether the underlying source has been fully drained.
    pub fn is_consumed(&self) -> bool {
        self.source.is_none()
    }

    /// Re-encode the remaining chunks as SSE bytes, ending with `done`.
    ///
    /// A decode error ends the byte stream with that error and no `done`.
    pub fn into_sse(self) -> impl Stream<Item = StreamResult<Bytes>> + Send {
        let done = stream::once(async {
            Ok::<_, StreamError>(Bytes::from(SseEvent::done().encode()))
        });
        let mut failed = false;
        self.map(|chunk| chunk.map(|chunk| Bytes::from(SseEvent::from_chunk(&chunk).encode())))
            .chain(done)
            .take_while(move |item| {
                let keep = !failed;
                failed |= item.is_err();
                futures::future::ready(keep)
            })
    }
}

impl Stream for BraintrustStream {
    type Item = StreamResult<StreamChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(source) = this.source.as_mut() else {
            return Poll::Ready(None);
        };

        match ready!(source.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                this.reducer.push_chunk(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(error)) => {
                debug!(error = %error, "braintrust stream failed");
                this.source = None;
                this.reducer = FinalValueReducer::new();
                this.outcome = Some(Err(error.clone()));
                Poll::Ready(Some(Err(error)))
            }
            None => {
                this.source = None;
                let reducer = std::mem::take(&mut this.reducer);
                debug!(chunks = reducer.chunk_count(), "braintrust stream drained");
                this.outcome = Some(reducer.finish());
                Poll::Ready(None)
            }
        }
    }
}

impl From<Vec<StreamChunk>> for BraintrustStream {
    fn from(chunks: Vec<StreamChunk>) -> Self {
        Self::from_chunk_list(chunks)
    }
}

impl fmt::Debug for BraintrustStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BraintrustStream")
            .field("consumed", &self.is_consumed())
            .field("chunks_read", &self.reducer.chunk_count())
            .field("outcome", &self.outcome)
            .finish()
    }
}
