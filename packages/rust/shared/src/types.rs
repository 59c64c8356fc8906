//! Core domain types passed between brochure stages.

use serde::{Deserialize, Serialize};

/// Title used when a page declares no `<title>`.
pub const NO_TITLE: &str = "No title found";

/// Label of the caller-supplied root page in an [`AggregatedDocument`].
pub const LANDING_PAGE_LABEL: &str = "Landing page";

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A fetched and cleaned web page.
///
/// `text` holds visible body text only (no markup, no script/style/image/input
/// content). `outbound_links` holds raw, non-empty `href` values in document
/// order; relative links are left unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// URL the page was requested from.
    pub url: String,
    /// Declared title, or [`NO_TITLE`].
    pub title: String,
    /// Newline-joined visible text of the body.
    pub text: String,
    /// Raw anchor `href` values.
    pub outbound_links: Vec<String>,
}

impl Page {
    /// Render the page the way it is fed to the model.
    pub fn contents(&self) -> String {
        format!(
            "Webpage Title:\n{}\nWebpage Contents:\n{}\n\n",
            self.title, self.text
        )
    }
}

// ---------------------------------------------------------------------------
// LinkCandidate
// ---------------------------------------------------------------------------

/// A model-selected link, tagged with a free-form category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Category label, e.g. `"about page"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Absolute HTTP(S) URL.
    pub url: String,
}

// ---------------------------------------------------------------------------
// AggregatedDocument
// ---------------------------------------------------------------------------

/// A page together with the label it is presented under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledPage {
    pub label: String,
    pub page: Page,
}

/// Ordered, labeled pages gathered for one brochure.
///
/// The landing page is always first; selected pages follow in the order the
/// link selector returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedDocument {
    sections: Vec<LabeledPage>,
}

impl AggregatedDocument {
    /// Start a document from the landing page.
    pub fn new(landing: Page) -> Self {
        Self {
            sections: vec![LabeledPage {
                label: LANDING_PAGE_LABEL.to_string(),
                page: landing,
            }],
        }
    }

    /// Append a selected page under `label`.
    pub fn push(&mut self, label: impl Into<String>, page: Page) {
        self.sections.push(LabeledPage {
            label: label.into(),
            page,
        });
    }

    /// Sections in discovery order, landing page first.
    pub fn sections(&self) -> &[LabeledPage] {
        &self.sections
    }

    /// Section labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Concatenate all sections into one untruncated string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i == 0 {
                out.push_str(&format!("{}:\n", section.label));
            } else {
                out.push_str(&format!("\n\n{}\n", section.label));
            }
            out.push_str(&section.page.contents());
        }
        out
    }
}
