//! Shared types, error model, and configuration for the brochure generator.
//!
//! This crate is the foundation depended on by all other brochure crates.
//! It provides:
//! - [`BrochureError`]: the unified error type
//! - Domain types ([`Page`], [`LinkCandidate`], [`AggregatedDocument`])
//! - Configuration ([`AppConfig`], runtime settings, config loading, credential checks)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiKey, AppConfig, BrochureConfig, BrochureSection, FetchConfig, FetchSection, ModelConfig,
    OpenAiSection, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{BrochureError, Result};
pub use types::{
    AggregatedDocument, LANDING_PAGE_LABEL, LabeledPage, LinkCandidate, NO_TITLE, Page,
};
