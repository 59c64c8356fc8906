//! Server-sent-event parser for streaming chat completions.
//!
//! Turns a raw byte stream into text fragments. Bytes are buffered until a
//! full line is available, so multi-byte characters split across network
//! chunks decode correctly.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

use brochure_shared::{BrochureError, Result};

use crate::types::StreamChunkRaw;

const DONE_SENTINEL: &str = "[DONE]";

/// Text fragments decoded from an SSE byte stream.
///
/// Ends after `data: [DONE]`, at end of input, or right after the first error.
/// Role-only and empty deltas are skipped.
pub struct SseFragments {
    inner: BoxStream<'static, Result<Bytes>>,
    buffer: Vec<u8>,
    eof: bool,
    finished: bool,
}

impl SseFragments {
    pub fn new<S, E>(bytes: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + 'static,
    {
        let inner = bytes
            .map(|chunk| chunk.map_err(|e| BrochureError::model(format!("stream read failed: {e}"))))
            .boxed();

        Self {
            inner,
            buffer: Vec::new(),
            eof: false,
            finished: false,
        }
    }
}

/// Outcome of decoding one buffered line.
enum Event {
    Fragment(String),
    Done,
}

impl Stream for SseFragments {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match next_event(&mut this.buffer) {
                Some(Ok(Event::Fragment(text))) => return Poll::Ready(Some(Ok(text))),
                Some(Ok(Event::Done)) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(e)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None if this.eof => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                None => {}
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // Terminate a trailing unterminated line so it is still decoded.
                    this.eof = true;
                    if !this.buffer.is_empty() {
                        this.buffer.push(b'\n');
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Decode buffered lines until one yields an event.
/// Returns `None` when no complete line is left.
fn next_event(buffer: &mut Vec<u8>) -> Option<Result<Event>> {
    loop {
        let newline = buffer.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = buffer.drain(..=newline).collect();

        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                return Some(Err(BrochureError::model(format!(
                    "invalid UTF-8 in stream: {e}"
                ))));
            }
        };

        // Blank separators, comments, and `event:`/`id:`/`retry:` fields.
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim_start();

        if data == DONE_SENTINEL {
            return Some(Ok(Event::Done));
        }

        let chunk: StreamChunkRaw = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return Some(Err(BrochureError::model(format!(
                    "malformed stream chunk: {e}"
                ))));
            }
        };

        if let Some(error) = chunk.error {
            return Some(Err(BrochureError::model(format!(
                "provider error mid-stream: {error}"
            ))));
        }

        let text = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .unwrap_or_default();

        if !text.is_empty() {
            return Some(Ok(Event::Fragment(text)));
        }
    }
}
