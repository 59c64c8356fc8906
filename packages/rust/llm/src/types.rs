//! Chat request and response types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Output constraint for a non-streaming completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// The reply must be one JSON object.
    JsonObject,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormatRaw>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormatRaw {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    pub(crate) fn to_raw(self) -> Option<ResponseFormatRaw> {
        match self {
            Self::Text => None,
            Self::JsonObject => Some(ResponseFormatRaw {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    #[serde(default)]
    pub choices: Vec<ChatChoiceRaw>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceRaw {
    pub message: ChatMessageRaw,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageRaw {
    #[serde(default)]
    pub content: Option<String>,
}

/// One server-sent event payload of a streaming completion.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunkRaw {
    #[serde(default)]
    pub choices: Vec<StreamChoiceRaw>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoiceRaw {
    #[serde(default)]
    pub delta: Option<DeltaRaw>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeltaRaw {
    #[serde(default)]
    pub content: Option<String>,
}
