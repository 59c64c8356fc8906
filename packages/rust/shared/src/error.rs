//! Error types for the brochure generator.
//!
//! Library crates use [`BrochureError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for every brochure stage.
#[derive(Debug, thiserror::Error)]
pub enum BrochureError {
    /// Transport failure or non-success HTTP status while retrieving a page.
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The response body cannot be treated as markup.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The model's structured response is malformed or fails validation.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Text-generation call or stream failure.
    #[error("model error: {0}")]
    Model(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrochureError>;

impl BrochureError {
    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Create a model error from any displayable message.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Parse { .. } => "parse",
            Self::Schema { .. } => "schema",
            Self::Model(_) => "model",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }
}
