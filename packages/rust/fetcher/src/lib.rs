//! Page retrieval and content extraction.
//!
//! This crate provides:
//! - [`PageFetcher`]: one HTTP retrieval per page with a browser-like header set
//! - [`extract_page`]: pure HTML to [`Page`](brochure_shared::Page) extraction (title, visible text, raw links)

pub mod extract;
pub mod fetch;

pub use extract::extract_page;
pub use fetch::PageFetcher;
