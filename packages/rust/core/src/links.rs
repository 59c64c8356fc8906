//! Model-driven selection of brochure-relevant links.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use brochure_llm::{ResponseFormat, TextGenerator};
use brochure_shared::{BrochureError, LinkCandidate, Page, Result};

use crate::prompts::link_messages;

/// Asks the model which of a page's links belong in a brochure.
#[derive(Clone)]
pub struct LinkSelector {
    generator: Arc<dyn TextGenerator>,
}

impl LinkSelector {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Select relevant links from `page`.
    ///
    /// One JSON-mode completion, parsed once; no retry on a malformed reply.
    #[instrument(skip_all, fields(url = %page.url, links = page.outbound_links.len()))]
    pub async fn select_links(&self, page: &Page) -> Result<Vec<LinkCandidate>> {
        let messages = link_messages(page);
        let raw = self
            .generator
            .complete(&messages, ResponseFormat::JsonObject)
            .await?;
        debug!(chars = raw.len(), "link selection received");

        let candidates = parse_link_selection(&raw)?;
        info!(selected = candidates.len(), "links selected");
        Ok(candidates)
    }
}

/// Validate a `{"links": [{"type": ..., "url": ...}]}` payload.
///
/// Every entry needs a non-blank string `type` and a string `url` that is an
/// absolute `http`/`https` URL. Any violation rejects the whole payload.
pub fn parse_link_selection(raw: &str) -> Result<Vec<LinkCandidate>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| BrochureError::schema(format!("response is not valid JSON: {e}")))?;

    let links = value
        .get("links")
        .ok_or_else(|| BrochureError::schema("response has no `links` field"))?
        .as_array()
        .ok_or_else(|| BrochureError::schema("`links` is not an array"))?;

    links
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_candidate(index, entry))
        .collect()
}

fn parse_candidate(index: usize, entry: &Value) -> Result<LinkCandidate> {
    let entry = entry
        .as_object()
        .ok_or_else(|| BrochureError::schema(format!("links[{index}] is not an object")))?;

    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| BrochureError::schema(format!("links[{index}].type is missing or not a string")))?;
    if kind.trim().is_empty() {
        return Err(BrochureError::schema(format!("links[{index}].type is blank")));
    }

    let url = entry
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| BrochureError::schema(format!("links[{index}].url is missing or not a string")))?;
    let parsed = Url::parse(url).map_err(|e| {
        BrochureError::schema(format!("links[{index}].url `{url}` is not an absolute URL: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BrochureError::schema(format!(
            "links[{index}].url `{url}` is not an http(s) URL"
        )));
    }

    Ok(LinkCandidate {
        kind: kind.to_string(),
        url: url.to_string(),
    })
}
