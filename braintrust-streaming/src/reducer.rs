//! Final value reduction.
//!
//! A drained stream reduces to one [`FinalValue`]: if any JSON delta was
//! seen, the concatenated JSON fragments are parsed and any text is
//! discarded; otherwise the concatenated text is used.

use crate::error::{StreamError, StreamResult};
use braintrust_core::{FinalValue, StreamChunk};
use bytes::Bytes;
use futures::{ready, Stream, StreamExt};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Accumulates chunks into a [`FinalValue`].
#[derive(Debug, Clone, Default)]
pub struct FinalValueReducer {
    // Bytes, so a UTF-8 sequence may span raw byte items.
    text: Vec<u8>,
    json: String,
    text_chunks: usize,
    json_chunks: usize,
}

impl FinalValueReducer {
    /// Create an empty reducer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a typed chunk.
    pub fn push_chunk(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::TextDelta { data } => self.push_text(data),
            StreamChunk::JsonDelta { data } => {
                self.json.push_str(data);
                self.json_chunks += 1;
            }
        }
    }

    /// Fold a raw text fragment as a text delta.
    pub fn push_text(&mut self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    /// Fold a raw byte fragment as a text delta.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.text.extend_from_slice(bytes);
        self.text_chunks += 1;
    }

    /// Whether any JSON delta has been folded.
    #[must_use]
    pub fn has_json(&self) -> bool {
        self.json_chunks > 0
    }

    /// Number of chunks folded so far.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.text_chunks + self.json_chunks
    }

    /// Produce the final value.
    pub fn finish(self) -> StreamResult<FinalValue> {
        if self.json_chunks > 0 {
            return serde_json::from_str(&self.json)
                .map(FinalValue::Json)
                .map_err(|e| StreamError::FinalValueParse(e.to_string()));
        }

        if self.text_chunks > 0 {
            return String::from_utf8(self.text)
                .map(FinalValue::Text)
                .map_err(|e| StreamError::FinalValueParse(e.to_string()));
        }

        Ok(FinalValue::Empty)
    }
}

/// Items a [`FinalValueReducer`] can fold.
///
/// Raw text and bytes are treated as text deltas.
pub trait ReducibleChunk {
    /// Fold this item into the reducer.
    fn reduce_into(&self, reducer: &mut FinalValueReducer);
}

impl ReducibleChunk for StreamChunk {
    fn reduce_into(&self, reducer: &mut FinalValueReducer) {
        reducer.push_chunk(self);
    }
}

impl ReducibleChunk for String {
    fn reduce_into(&self, reducer: &mut FinalValueReducer) {
        reducer.push_text(self);
    }
}

impl ReducibleChunk for Bytes {
    fn reduce_into(&self, reducer: &mut FinalValueReducer) {
        reducer.push_bytes(self);
    }
}

impl ReducibleChunk for Vec<u8> {
    fn reduce_into(&self, reducer: &mut FinalValueReducer) {
        reducer.push_bytes(self);
    }
}

/// Drain a stream and reduce it to its final value.
///
/// The first error is returned as is; no partial value is produced.
pub async fn reduce_stream<S, T>(stream: S) -> StreamResult<FinalValue>
where
    S: Stream<Item = StreamResult<T>>,
    T: ReducibleChunk,
{
    futures::pin_mut!(stream);
    let mut reducer = FinalValueReducer::new();
    while let Some(item) = stream.next().await {
        item?.reduce_into(&mut reducer);
    }
    reducer.finish()
}

/// Callback receiving the outcome of a [`FinalValuePassThrough`].
pub type FinalValueCallback = Box<dyn FnOnce(StreamResult<FinalValue>) + Send>;

pin_project! {
    /// Forwards items unchanged while folding them into a final value.
    ///
    /// The callback runs exactly once: with the final value at end of input,
    /// with the error if the source fails, or with
    /// [`StreamError::Interrupted`] if the adapter is dropped first.
    pub struct FinalValuePassThrough<S> {
        #[pin]
        inner: S,
        reducer: Option<FinalValueReducer>,
        on_final: Option<FinalValueCallback>,
    }

    impl<S> PinnedDrop for FinalValuePassThrough<S> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(on_final) = this.on_final.take() {
                on_final(Err(StreamError::Interrupted));
            }
        }
    }
}

impl<S> FinalValuePassThrough<S> {
    /// Wrap a stream, reporting its final value to `on_final`.
    pub fn new<F>(inner: S, on_final: F) -> Self
    where
        F: FnOnce(StreamResult<FinalValue>) + Send + 'static,
    {
        Self {
            inner,
            reducer: Some(FinalValueReducer::new()),
            on_final: Some(Box::new(on_final)),
        }
    }
}

impl<S, T> Stream for FinalValuePassThrough<S>
where
    S: Stream<Item = StreamResult<T>>,
    T: ReducibleChunk,
{
    type Item = StreamResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(item)) => {
                if let Some(reducer) = this.reducer.as_mut() {
                    item.reduce_into(reducer);
                }
                Poll::Ready(Some(Ok(item)))
            }
            Some(Err(error)) => {
                this.reducer.take();
                if let Some(on_final) = this.on_final.take() {
                    on_final(Err(error.clone()));
                }
                Poll::Ready(Some(Err(error)))
            }
            None => {
                if let Some(on_final) = this.on_final.take() {
                    let reducer = this.reducer.take().unwrap_or_default();
                    on_final(reducer.finish());
                }
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn capture() -> (
        Arc<Mutex<Vec<StreamResult<FinalValue>>>>,
        impl FnOnce(StreamResult<FinalValue>) + Send + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |outcome| sink.lock().push(outcome))
    }

    #[test]
    fn test_reducer_concatenates_text_in_order() {
        let mut reducer = FinalValueReducer::new();
        for piece in ["a", "b", "c"] {
            reducer.push_chunk(&StreamChunk::text(piece));
        }
        assert_eq!(reducer.finish().unwrap(), FinalValue::Text("abc".into()));
    }

    #[test]
    fn test_reducer_json_wins() {
        let mut reducer = FinalValueReducer::new();
        reducer.push_chunk(&StreamChunk::text("ignored"));
        reducer.push_chunk(&StreamChunk::json("{\"a\":"));
        reducer.push_chunk(&StreamChunk::text("also ignored"));
        reducer.push_chunk(&StreamChunk::json("1}"));

        assert!(reducer.has_json());
        assert_eq!(
            reducer.finish().unwrap(),
            FinalValue::Json(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_reducer_empty() {
        assert_eq!(FinalValueReducer::new().finish().unwrap(), FinalValue::Empty);
    }

    #[test]
    fn test_reducer_empty_text_chunk_is_text() {
        let mut reducer = FinalValueReducer::new();
        reducer.push_chunk(&StreamChunk::text(""));
        assert_eq!(reducer.finish().unwrap(), FinalValue::Text(String::new()));
    }

    #[test]
    fn test_reducer_invalid_json() {
        let mut reducer = FinalValueReducer::new();
        reducer.push_chunk(&StreamChunk::json("{\"a\":"));
        let err = reducer.finish().unwrap_err();
        assert!(matches!(err, StreamError::FinalValueParse(_)));
    }

    #[test]
    fn test_reducer_bytes_may_split_utf8() {
        let bytes = "naïve".as_bytes();
        let mut reducer = FinalValueReducer::new();
        reducer.push_bytes(&bytes[..3]);
        reducer.push_bytes(&bytes[3..]);
        assert_eq!(reducer.chunk_count(), 2);
        assert_eq!(reducer.finish().unwrap(), FinalValue::Text("naïve".into()));
    }

    #[tokio::test]
    async fn test_reduce_stream_raw_text() {
        let items: Vec<StreamResult<String>> = vec![Ok("x".into()), Ok("y".into())];
        let value = reduce_stream(stream::iter(items)).await.unwrap();
        assert_eq!(value, FinalValue::Text("xy".into()));
    }

    #[tokio::test]
    async fn test_reduce_stream_propagates_error() {
        let items = vec![
            Ok(StreamChunk::text("x")),
            Err(StreamError::Transport("reset".into())),
        ];
        let err = reduce_stream(stream::iter(items)).await.unwrap_err();
        assert!(matches!(err, StreamError::Transport(_)));
    }

    #[tokio::test]
    async fn test_pass_through_forwards_and_reports() {
        let (seen, on_final) = capture();
        let items = vec![Ok(StreamChunk::text("x")), Ok(StreamChunk::text("y"))];

        let forwarded: Vec<StreamChunk> = FinalValuePassThrough::new(stream::iter(items), on_final)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(forwarded, vec![StreamChunk::text("x"), StreamChunk::text("y")]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_ref().unwrap(), &FinalValue::Text("xy".into()));
    }

    #[tokio::test]
    async fn test_pass_through_reports_error_once() {
        let (seen, on_final) = capture();
        let items = vec![
            Ok(StreamChunk::json("{")),
            Err(StreamError::ParseSse("bad".into())),
        ];

        let forwarded: Vec<StreamResult<StreamChunk>> =
            FinalValuePassThrough::new(stream::iter(items), on_final)
                .collect()
                .await;

        assert_eq!(forwarded.len(), 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Err(StreamError::ParseSse(_))));
    }

    #[tokio::test]
    async fn test_pass_through_dropped_early_reports_interrupted() {
        let (seen, on_final) = capture();
        let items = vec![Ok(StreamChunk::text("x")), Ok(StreamChunk::text("y"))];

        {
            let mut pass = Box::pin(FinalValuePassThrough::new(stream::iter(items), on_final));
            let first = pass.next().await.map(|item| item.is_ok());
            assert_eq!(first, Some(true));
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Err(StreamError::Interrupted)));
    }

    #[tokio::test]
    async fn test_pass_through_accepts_bytes() {
        let (seen, on_final) = capture();
        let items: Vec<StreamResult<Bytes>> =
            vec![Ok(Bytes::from_static(b"he")), Ok(Bytes::from_static(b"y"))];

        let count = FinalValuePassThrough::new(stream::iter(items), on_final)
            .map(|item| item.is_ok())
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await;

        assert_eq!(count, 2);
        let outcome = seen.lock().pop().and_then(Result::ok);
        assert_eq!(outcome, Some(FinalValue::Text("hey".into())));
    }
}
