//! Prompt contracts for link selection and brochure synthesis.

use tracing::warn;

use brochure_llm::Message;
use brochure_shared::{AggregatedDocument, Page};

/// Instructions for picking brochure-relevant links, with a one-shot example.
pub const LINK_SYSTEM_PROMPT: &str = concat!(
    "You are provided with a list of links found on a webpage. ",
    "You are able to decide which of the links would be most relevant to include in a brochure about the company, ",
    "such as links to an About page, or a Company page, or Careers/Jobs pages.\n",
    "You should respond in JSON as in this example:",
    r#"
{
    "links": [
        {"type": "about page", "url": "https://full.url/goes/here/about"},
        {"type": "careers page", "url": "https://another.full.url/careers"}
    ]
}
"#,
);

pub const BROCHURE_SYSTEM_PROMPT: &str = concat!(
    "You are an assistant that analyzes the contents of several relevant pages from a company website ",
    "and creates a short brochure about the company for prospective customers, investors and recruits. Respond in markdown.",
    "Include details of company culture, customers and careers/jobs if you have the information.",
);

/// User message asking the model to filter `page`'s raw links.
pub fn link_user_prompt(page: &Page) -> String {
    let mut prompt = format!("Here is the list of links on the website of {} - ", page.url);
    prompt.push_str(
        "please decide which of these are relevant web links for a brochure about the company, \
         respond with the full https URL in JSON format. \
         Do not include Terms of Service, Privacy, email links.\n",
    );
    prompt.push_str("Links (some might be relative links):\n");
    prompt.push_str(&page.outbound_links.join("\n"));
    prompt
}

pub fn link_messages(page: &Page) -> Vec<Message> {
    vec![
        Message::system(LINK_SYSTEM_PROMPT),
        Message::user(link_user_prompt(page)),
    ]
}

/// User message for synthesis: company sentence, instruction, then the
/// rendered document, cut once to the first `max_chars` characters.
pub fn brochure_user_prompt(company_name: &str, doc: &AggregatedDocument, max_chars: usize) -> String {
    let mut prompt = format!("You are looking at a company called: {company_name}\n");
    prompt.push_str(
        "Here are the contents of its landing page and other relevant pages; \
         use this information to build a short brochure of the company in markdown.\n",
    );
    prompt.push_str(&doc.render());
    truncate_chars(prompt, max_chars)
}

pub fn brochure_messages(
    company_name: &str,
    doc: &AggregatedDocument,
    max_chars: usize,
) -> Vec<Message> {
    vec![
        Message::system(BROCHURE_SYSTEM_PROMPT),
        Message::user(brochure_user_prompt(company_name, doc, max_chars)),
    ]
}

/// Keep the first `max_chars` Unicode scalar values of `text`.
fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((cut, _)) = text.char_indices().nth(max_chars) {
        warn!(
            chars = text.chars().count(),
            max_chars, "brochure prompt truncated"
        );
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, text: &str, links: &[&str]) -> Page {
        Page {
            url: url.into(),
            title: "Acme Inc".into(),
            text: text.into(),
            outbound_links: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn link_system_prompt_carries_json_example() {
        assert!(LINK_SYSTEM_PROMPT.contains("Careers/Jobs pages.\nYou should respond in JSON"));
        assert!(LINK_SYSTEM_PROMPT.contains(r#"{"type": "about page", "url": "https://full.url/goes/here/about"}"#));
    }

    #[test]
    fn link_user_prompt_lists_raw_links() {
        let p = page("https://acme.test/", "", &["/about", "/careers", "mailto:hi@acme.test"]);
        let prompt = link_user_prompt(&p);
        assert!(prompt.starts_with("Here is the list of links on the website of https://acme.test/ - please decide"));
        assert!(prompt.contains("Do not include Terms of Service, Privacy, email links.\n"));
        assert!(prompt.ends_with("Links (some might be relative links):\n/about\n/careers\nmailto:hi@acme.test"));

        let messages = link_messages(&p);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, LINK_SYSTEM_PROMPT);
        assert_eq!(messages[1].content, prompt);
    }

    #[test]
    fn brochure_user_prompt_layout() {
        let doc = AggregatedDocument::new(page("https://acme.test/", "Anvils.", &[]));
        let prompt = brochure_user_prompt("Acme", &doc, 10_000);
        assert_eq!(
            prompt,
            "You are looking at a company called: Acme\n\
             Here are the contents of its landing page and other relevant pages; \
             use this information to build a short brochure of the company in markdown.\n\
             Landing page:\nWebpage Title:\nAcme Inc\nWebpage Contents:\nAnvils.\n\n"
        );
    }

    #[test]
    fn brochure_user_prompt_is_bounded() {
        let mut doc = AggregatedDocument::new(page("https://acme.test/", &"a".repeat(8_000), &[]));
        doc.push("about page", page("https://acme.test/about", &"b".repeat(8_000), &[]));

        let prompt = brochure_user_prompt("Acme", &doc, 10_000);
        assert_eq!(prompt.chars().count(), 10_000);
        assert!(prompt.starts_with("You are looking at a company called: Acme\n"));
        // Truncation happens at the end: the about section is cut, not dropped.
        assert!(prompt.contains("\n\nabout page\n"));
        assert!(prompt.ends_with('b'));
    }

    #[test]
    fn truncation_never_splits_characters() {
        let text = "é".repeat(20);
        let cut = truncate_chars(text, 7);
        assert_eq!(cut.chars().count(), 7);
        assert_eq!(cut, "é".repeat(7));

        assert_eq!(truncate_chars("short".into(), 10), "short");
        assert_eq!(truncate_chars("exact".into(), 5), "exact");
    }
}
