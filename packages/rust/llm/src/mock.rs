//! Scripted text generator for tests.
//!
//! Returns a fixed completion and a fixed list of streamed fragments, can fail
//! on demand, and records every call so tests can inspect the prompts that
//! were sent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use brochure_shared::{BrochureError, Result};

use crate::types::{Message, ResponseFormat};
use crate::{FragmentStream, TextGenerator};

/// One recorded call to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Complete {
        messages: Vec<Message>,
        format: ResponseFormat,
    },
    Stream {
        messages: Vec<Message>,
    },
}

impl MockCall {
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Complete { messages, .. } | Self::Stream { messages } => messages,
        }
    }
}

/// Mock text generator.
#[derive(Default)]
pub struct MockGenerator {
    completion: Option<String>,
    completion_error: Option<String>,
    fragments: Vec<String>,
    /// Fail the stream after this many fragments.
    stream_error: Option<(usize, String)>,
    open_error: Option<String>,
    /// Keep the stream open after the scripted fragments.
    hang_after_fragments: bool,
    calls: Mutex<Vec<MockCall>>,
    streams_open: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to every `complete` call with `response`.
    pub fn with_completion(mut self, response: impl Into<String>) -> Self {
        self.completion = Some(response.into());
        self
    }

    /// Fail every `complete` call with a model error.
    pub fn with_completion_failure(mut self, message: impl Into<String>) -> Self {
        self.completion_error = Some(message.into());
        self
    }

    /// Stream these fragments from every `complete_streaming` call.
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Emit a model error after the first `after` fragments.
    pub fn with_stream_failure(mut self, after: usize, message: impl Into<String>) -> Self {
        self.stream_error = Some((after, message.into()));
        self
    }

    /// Reject `complete_streaming` before any fragment.
    pub fn with_open_failure(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Never end the stream after the scripted fragments.
    pub fn hanging(mut self) -> Self {
        self.hang_after_fragments = true;
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    /// Streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.streams_open.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockCall) {
        self.lock_calls().push(call);
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Decrements the open-stream counter when the stream is dropped.
struct OpenStreamGuard(Arc<AtomicUsize>);

impl OpenStreamGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for OpenStreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, messages: &[Message], format: ResponseFormat) -> Result<String> {
        self.record(MockCall::Complete {
            messages: messages.to_vec(),
            format,
        });

        if let Some(message) = &self.completion_error {
            return Err(BrochureError::model(message.clone()));
        }
        Ok(self.completion.clone().unwrap_or_default())
    }

    async fn complete_streaming(&self, messages: &[Message]) -> Result<FragmentStream> {
        self.record(MockCall::Stream {
            messages: messages.to_vec(),
        });

        if let Some(message) = &self.open_error {
            return Err(BrochureError::model(message.clone()));
        }

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if let Some((after, message)) = &self.stream_error {
            items.truncate(*after);
            items.push(Err(BrochureError::model(message.clone())));
        }

        let scripted = stream::iter(items);
        let body: FragmentStream = if self.hang_after_fragments {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        };

        let guard = OpenStreamGuard::new(&self.streams_open);
        Ok(body
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }
}
