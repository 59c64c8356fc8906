//! Streaming brochure synthesis.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use brochure_llm::{FragmentStream, TextGenerator};
use brochure_shared::{BrochureConfig, BrochureError, Result};

use crate::aggregate::ContentAggregator;
use crate::pipeline::{ProgressReporter, SilentProgress};
use crate::prompts::brochure_messages;

/// Turns an aggregated document into a streamed brochure.
#[derive(Clone)]
pub struct BrochureSynthesizer {
    aggregator: ContentAggregator,
    generator: Arc<dyn TextGenerator>,
    config: BrochureConfig,
}

impl BrochureSynthesizer {
    pub fn new(
        aggregator: ContentAggregator,
        generator: Arc<dyn TextGenerator>,
        config: BrochureConfig,
    ) -> Self {
        Self {
            aggregator,
            generator,
            config,
        }
    }

    pub async fn synthesize(&self, company_name: &str, root_url: &str) -> Result<BrochureStream> {
        self.synthesize_with_progress(company_name, root_url, &SilentProgress)
            .await
    }

    /// Aggregate `root_url` and open the completion stream.
    ///
    /// Returns only once the stream is open, so any failure up to that point
    /// means no brochure text at all.
    #[instrument(skip_all, fields(company = %company_name, url = %root_url))]
    pub async fn synthesize_with_progress(
        &self,
        company_name: &str,
        root_url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<BrochureStream> {
        let doc = self
            .aggregator
            .aggregate_with_progress(root_url, progress)
            .await?;

        let messages = brochure_messages(company_name, &doc, self.config.max_prompt_chars);
        progress.phase("Writing brochure");
        let fragments = self.generator.complete_streaming(&messages).await?;

        info!(sections = doc.len(), "brochure stream opened");
        Ok(BrochureStream::new(fragments))
    }
}

// ---------------------------------------------------------------------------
// BrochureStream
// ---------------------------------------------------------------------------

/// Brochure text as it grows.
///
/// Each item is the whole text so far, so every item is a prefix of the next.
/// A fragment error is yielded once and ends the stream; items already
/// yielded stay valid. Closing or dropping the stream releases the
/// underlying completion.
pub struct BrochureStream {
    fragments: Option<FragmentStream>,
    buffer: String,
}

impl BrochureStream {
    pub fn new(fragments: FragmentStream) -> Self {
        Self {
            fragments: Some(fragments),
            buffer: String::new(),
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Stop consuming and release the completion stream.
    pub fn close(&mut self) {
        if self.fragments.take().is_some() {
            debug!(chars = self.buffer.len(), "brochure stream closed early");
        }
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}

impl std::fmt::Debug for BrochureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrochureStream")
            .field("open", &self.fragments.is_some())
            .field("chars", &self.buffer.len())
            .finish()
    }
}

impl Stream for BrochureStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(fragments) = this.fragments.as_mut() else {
                return Poll::Ready(None);
            };

            match fragments.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(fragment))) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    this.buffer.push_str(&fragment);
                    return Poll::Ready(Some(Ok(this.buffer.clone())));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.fragments = None;
                    warn!(
                        error = %err,
                        kind = err.kind(),
                        chars = this.buffer.len(),
                        "brochure stream failed"
                    );
                    let err = match err {
                        BrochureError::Model(_) => err,
                        other => BrochureError::model(other.to_string()),
                    };
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.fragments = None;
                    info!(chars = this.buffer.len(), "brochure complete");
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl FusedStream for BrochureStream {
    fn is_terminated(&self) -> bool {
        self.fragments.is_none()
    }
}
