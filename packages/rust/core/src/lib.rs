//! Brochure pipeline for the brochure generator.
//!
//! This crate ties page fetching, model-driven link selection, aggregation,
//! and streaming synthesis into one entry point,
//! [`BrochureContext::generate_brochure`].

pub mod aggregate;
pub mod links;
pub mod pipeline;
pub mod prompts;
pub mod synthesize;

pub use aggregate::ContentAggregator;
pub use links::{LinkSelector, parse_link_selection};
pub use pipeline::{BrochureContext, ProgressReporter, SilentProgress};
pub use synthesize::{BrochureStream, BrochureSynthesizer};
