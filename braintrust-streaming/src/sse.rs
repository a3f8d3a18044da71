//! Server-Sent Events (SSE) parsing and encoding.
//!
//! This module turns raw byte or text buffers into [`SseEvent`]s, tolerating
//! arbitrary transport chunk boundaries, and serializes events back to the
//! wire format.

use crate::config::DEFAULT_MAX_BUFFER_SIZE;
use crate::error::{StreamError, StreamResult};
use braintrust_core::{StreamChunk, StreamEventKind};
use bytes::Bytes;
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (if specified).
    pub event: Option<String>,
    /// Event data. Multiple `data:` lines are joined with `\n`.
    pub data: String,
    /// Event ID (if specified).
    pub id: Option<String>,
    /// Reconnection time in milliseconds (if specified).
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Create a new SSE event with just data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Create the terminal `done` event.
    #[must_use]
    pub fn done() -> Self {
        Self::data("").with_event(StreamEventKind::Done.as_str())
    }

    /// Create the wire event carrying a chunk.
    ///
    /// Text payloads are JSON-quoted; JSON fragments are sent verbatim.
    #[must_use]
    pub fn from_chunk(chunk: &StreamChunk) -> Self {
        match chunk {
            StreamChunk::TextDelta { data } => {
                Self::data(JsonValue::String(data.clone()).to_string())
                    .with_event(StreamEventKind::TextDelta.as_str())
            }
            StreamChunk::JsonDelta { data } => {
                Self::data(data.clone()).with_event(StreamEventKind::JsonDelta.as_str())
            }
        }
    }

    /// Set the event type.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the event ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the reconnection time.
    #[must_use]
    pub fn with_retry(mut self, millis: u64) -> Self {
        self.retry = Some(millis);
        self
    }

    /// Check if this is a `done` event.
    pub fn is_done(&self) -> bool {
        self.event.as_deref() == Some(StreamEventKind::Done.as_str())
    }

    /// Check if this event only carries transport fields (`retry`, `id`).
    pub fn is_transport_only(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }

    /// Parse the data as JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }

    /// Serialize to the SSE wire format, including the blank line terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            out.push_str(&format!("id: {id}\n"));
        }
        if let Some(event) = &self.event {
            out.push_str(&format!("event: {event}\n"));
        }
        if let Some(retry) = self.retry {
            out.push_str(&format!("retry: {retry}\n"));
        }
        for line in self.data.split('\n') {
            out.push_str(&format!("data: {line}\n"));
        }
        out.push('\n');
        out
    }
}

/// Fields collected for the event currently being parsed.
#[derive(Debug, Default)]
struct PendingEvent {
    event: Option<String>,
    data: Vec<String>,
    // Bytes held in `data`, counted against the buffer limit.
    data_len: usize,
    id: Option<String>,
    retry: Option<u64>,
}

impl PendingEvent {
    fn is_blank(&self) -> bool {
        self.event.is_none() && self.data.is_empty() && self.id.is_none() && self.retry.is_none()
    }
}

/// Parser for Server-Sent Events streams.
///
/// Events are dispatched on a blank line. Unlike browsers, blocks that only
/// carry `retry:` or `id:` are dispatched too, so callers can observe
/// reconnection hints.
#[derive(Debug)]
pub struct SseParser {
    buffer: String,
    pending_bytes: Vec<u8>,
    current: PendingEvent,
    events: VecDeque<SseEvent>,
    last_event_id: Option<String>,
    max_buffer_size: usize,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    /// Create a new SSE parser.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_buffer_size(DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create a parser with a custom buffer limit.
    #[must_use]
    pub fn with_max_buffer_size(max_buffer_size: usize) -> Self {
        Self {
            buffer: String::new(),
            pending_bytes: Vec::new(),
            current: PendingEvent::default(),
            events: VecDeque::new(),
            last_event_id: None,
            max_buffer_size,
        }
    }

    /// Feed bytes into the parser.
    ///
    /// A UTF-8 sequence split across calls is held back until it completes.
    /// Returns the number of events that became available.
    pub fn feed(&mut self, bytes: &[u8]) -> StreamResult<usize> {
        self.pending_bytes.extend_from_slice(bytes);

        let valid_len = match std::str::from_utf8(&self.pending_bytes) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(StreamError::ParseSse(format!(
                    "invalid UTF-8 at byte {}",
                    e.valid_up_to()
                )))
            }
        };

        let tail = self.pending_bytes.split_off(valid_len);
        let complete = std::mem::replace(&mut self.pending_bytes, tail);
        let text = String::from_utf8(complete).map_err(|e| StreamError::ParseSse(e.to_string()))?;
        self.feed_str(&text)
    }

    /// Feed a string into the parser.
    ///
    /// Returns the number of events that became available.
    pub fn feed_str(&mut self, s: &str) -> StreamResult<usize> {
        let before = self.events.len();
        self.buffer.push_str(s);
        self.drain_lines(false);

        if self.buffered_len() > self.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }

        Ok(self.events.len() - before)
    }

    /// Call when the stream ends to flush any remaining event.
    ///
    /// A final event without its terminating blank line is still dispatched.
    pub fn finish(&mut self) -> StreamResult<usize> {
        if !self.pending_bytes.is_empty() {
            self.pending_bytes.clear();
            return Err(StreamError::ParseSse(
                "incomplete UTF-8 sequence at end of stream".to_string(),
            ));
        }

        let before = self.events.len();
        self.drain_lines(true);
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line);
        }
        self.dispatch();

        Ok(self.events.len() - before)
    }

    /// Get the next parsed event.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.events.pop_front()
    }

    /// Check if there are pending events.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get the last event ID.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Bytes held for the event currently being parsed, including the
    /// unterminated line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.current.data_len
    }

    /// Clear the parser state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_bytes.clear();
        self.current = PendingEvent::default();
        self.events.clear();
    }

    fn drain_lines(&mut self, eof: bool) {
        while let Some(line) = self.next_line(eof) {
            self.process_line(&line);
        }
    }

    /// Split off the next complete line, accepting `\n`, `\r\n` and `\r`.
    fn next_line(&mut self, eof: bool) -> Option<String> {
        let pos = self.buffer.find(['\r', '\n'])?;
        let terminator_len = if self.buffer.as_bytes()[pos] == b'\r' {
            match self.buffer.as_bytes().get(pos + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                // A trailing CR may be the first half of CRLF.
                None if eof => 1,
                None => return None,
            }
        } else {
            1
        };

        let line = self.buffer[..pos].to_string();
        self.buffer.drain(..pos + terminator_len);
        Some(line)
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            self.dispatch();
            return;
        }

        if line.starts_with(':') {
            // Comment
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                self.current.event = (!value.is_empty()).then(|| value.to_string());
            }
            "data" => {
                self.current.data_len += value.len() + 1;
                self.current.data.push(value.to_string());
            }
            "id" if !value.contains('\0') => self.current.id = Some(value.to_string()),
            "retry" => {
                if let Ok(millis) = value.parse() {
                    self.current.retry = Some(millis);
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) {
        let pending = std::mem::take(&mut self.current);
        if pending.is_blank() {
            return;
        }

        if let Some(id) = &pending.id {
            self.last_event_id = Some(id.clone());
        }

        self.events.push_back(SseEvent {
            event: pending.event,
            data: pending.data.join("\n"),
            id: pending.id,
            retry: pending.retry,
        });
    }
}

/// Raw buffers an [`SseStream`] can consume.
pub trait SseInput {
    /// Feed this buffer into the parser.
    fn feed_into(self, parser: &mut SseParser) -> StreamResult<usize>;
}

impl SseInput for Bytes {
    fn feed_into(self, parser: &mut SseParser) -> StreamResult<usize> {
        parser.feed(&self)
    }
}

impl SseInput for Vec<u8> {
    fn feed_into(self, parser: &mut SseParser) -> StreamResult<usize> {
        parser.feed(&self)
    }
}

impl SseInput for String {
    fn feed_into(self, parser: &mut SseParser) -> StreamResult<usize> {
        parser.feed_str(&self)
    }
}

impl SseInput for &'static str {
    fn feed_into(self, parser: &mut SseParser) -> StreamResult<usize> {
        parser.feed_str(self)
    }
}

pin_project! {
    /// Stream adapter that parses SSE from a byte or text stream.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        parser: SseParser,
        pending_error: Option<StreamError>,
        finished: bool,
    }
}

impl<S> SseStream<S> {
    /// Create a new SSE stream from a byte or text stream.
    pub fn new(inner: S) -> Self {
        Self::with_max_buffer_size(inner, DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create a new SSE stream with a custom buffer limit.
    pub fn with_max_buffer_size(inner: S, max_buffer_size: usize) -> Self {
        Self {
            inner,
            parser: SseParser::with_max_buffer_size(max_buffer_size),
            pending_error: None,
            finished: false,
        }
    }
}

impl<S, T, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<T, E>>,
    T: SseInput,
    E: Into<StreamError>,
{
    type Item = StreamResult<SseEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Events parsed before a failure are still delivered first.
            if let Some(event) = this.parser.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }

            if let Some(error) = this.pending_error.take() {
                return Poll::Ready(Some(Err(error)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(input)) => {
                    if let Err(error) = input.feed_into(this.parser) {
                        *this.finished = true;
                        *this.pending_error = Some(error);
                    }
                }
                Some(Err(error)) => {
                    *this.finished = true;
                    *this.pending_error = Some(error.into());
                }
                None => {
                    *this.finished = true;
                    if let Err(error) = this.parser.finish() {
                        *this.pending_error = Some(error);
                    }
                }
            }
        }
    }
}
