//! HTML to [`Page`] extraction.
//!
//! Parsing uses HTML5 error recovery, so any input produces a document.
//! Body text skips non-content nodes; links are collected from the whole
//! document and left exactly as written.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use brochure_shared::{NO_TITLE, Page};

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Subtrees whose content never reaches the extracted text.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "img", "input"];

/// Build a [`Page`] from raw markup retrieved from `url`.
pub fn extract_page(url: &str, html: &str) -> Page {
    let doc = Html::parse_document(html);

    Page {
        url: url.to_string(),
        title: extract_title(&doc),
        text: extract_text(html, &doc),
        outbound_links: extract_links(&doc),
    }
}

/// First `<title>`, trimmed; [`NO_TITLE`] when absent or blank.
fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Visible body text: one trimmed line per non-empty text node.
///
/// Empty unless the source markup has its own `<body>`; the body the
/// parser synthesises for body-less markup does not count.
fn extract_text(html: &str, doc: &Html) -> String {
    if !declares_body(html) {
        return String::new();
    }
    let Some(body) = doc.select(&BODY_SEL).next() else {
        return String::new();
    };

    let mut lines = Vec::new();
    collect_text(body, &mut lines);
    lines.join("\n")
}

/// True when `html` contains a `<body` start tag (any case).
fn declares_body(html: &str) -> bool {
    html.as_bytes().windows(6).any(|window| {
        window[0] == b'<'
            && window[1..5].eq_ignore_ascii_case(b"body")
            && matches!(window[5], b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
    })
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
            continue;
        }

        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_el.value().name();
        if SKIPPED_TAGS.contains(&name) {
            continue;
        }

        if name == "noscript" {
            // With scripting on, noscript content arrives as one raw-text node
            // that still contains tags.
            let raw: String = child_el.text().collect();
            let fragment = Html::parse_fragment(&raw);
            collect_text(fragment.root_element(), lines);
        } else {
            collect_text(child_el, lines);
        }
    }
}

/// Every anchor `href` in document order, raw; only empty values dropped.
fn extract_links(doc: &Html) -> Vec<String> {
    doc.select(&ANCHOR_SEL)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}
