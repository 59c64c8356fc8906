//! Text-generation client interface and its OpenAI-compatible implementation.
//!
//! The brochure stages only see [`TextGenerator`]: one JSON-mode completion for
//! link selection and one streaming completion for synthesis.

pub mod client;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod streaming;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;

use brochure_shared::Result;

pub use client::OpenAiClient;
pub use streaming::SseFragments;
pub use types::{Message, ResponseFormat, Role};

/// Text fragments of a streaming completion, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Interface to a hosted chat model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `messages` and return the whole reply.
    ///
    /// With [`ResponseFormat::JsonObject`] the model is constrained to emit a
    /// single JSON object; the payload is returned unparsed.
    async fn complete(&self, messages: &[Message], format: ResponseFormat) -> Result<String>;

    /// Open a streaming completion of `messages`.
    ///
    /// Dropping the returned stream releases the underlying connection.
    async fn complete_streaming(&self, messages: &[Message]) -> Result<FragmentStream>;
}
