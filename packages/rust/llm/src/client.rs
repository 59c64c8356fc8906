//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use brochure_shared::{ApiKey, BrochureError, ModelConfig, Result};

use crate::streaming::SseFragments;
use crate::types::{ChatRequest, ChatResponseRaw, Message, ResponseFormat};
use crate::{FragmentStream, TextGenerator};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on how much of an error body ends up in a message.
const MAX_ERROR_BODY: usize = 512;

/// Client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: ApiKey,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(config: &ModelConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BrochureError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| BrochureError::model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "completion request rejected");
            return Err(BrochureError::model(format!(
                "HTTP {status}: {}",
                clip(&body, MAX_ERROR_BODY)
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len(), ?format))]
    async fn complete(&self, messages: &[Message], format: ResponseFormat) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: format.to_raw(),
            stream: false,
        };

        let response = self.send(&request).await?;
        let body: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| BrochureError::model(format!("malformed completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BrochureError::model("completion response has no content"))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete_streaming(&self, messages: &[Message]) -> Result<FragmentStream> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: None,
            stream: true,
        };

        let response = self.send(&request).await?;
        debug!("completion stream opened");
        Ok(SseFragments::new(response.bytes_stream()).boxed())
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
