//! HTTP page retrieval.
//!
//! Each page costs exactly one request: the status is checked on the same
//! response whose body is then parsed.

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};
use url::Url;

use brochure_shared::{BrochureError, FetchConfig, Page, Result};

use crate::extract::extract_page;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";

/// Retrieves pages and turns them into [`Page`] values.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a fetcher with the given settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrochureError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url` and extract its title, visible text, and raw links.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Page> {
        let parsed =
            Url::parse(url).map_err(|e| BrochureError::fetch(url, format!("invalid URL: {e}")))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| BrochureError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "page request failed");
            return Err(BrochureError::fetch(url, format!("HTTP {status}")));
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !is_markup(content_type) {
                return Err(BrochureError::parse(format!(
                    "{url}: content type `{content_type}` is not markup"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| BrochureError::fetch(url, format!("body read failed: {e}")))?;

        let page = extract_page(url, &body);
        debug!(
            %status,
            body_len = body.len(),
            text_len = page.text.len(),
            links = page.outbound_links.len(),
            "page fetched"
        );

        Ok(page)
    }
}

/// True for textual types: `text/*` plus any `*html*` / `*xml*` type.
fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOME: &str = r#"<html><head><title>Acme Inc</title></head>
        <body><h1>Acme</h1><p>Anvils since 1949.</p>
        <a href="/about">About</a><a href="/careers">Careers</a></body></html>"#;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&FetchConfig::default()).expect("build fetcher")
    }

    #[test]
    fn markup_detection() {
        assert!(is_markup("text/html; charset=utf-8"));
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("text/plain"));
        assert!(is_markup(""));
        assert!(!is_markup("image/png"));
        assert!(!is_markup("application/pdf"));
        assert!(!is_markup("application/json"));
    }

    #[tokio::test]
    async fn fetches_and_extracts_with_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(HOME, "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/", server.uri());
        let page = fetcher().fetch(&url).await.expect("fetch page");

        assert_eq!(page.url, url);
        assert_eq!(page.title, "Acme Inc");
        assert_eq!(page.text, "Acme\nAnvils since 1949.\nAbout\nCareers");
        assert_eq!(page.outbound_links, vec!["/about", "/careers"]);
        // `expect(1)` is verified when the server drops.
    }

    #[tokio::test]
    async fn sends_browser_headers() {
        let server = MockServer::start().await;
        let config = FetchConfig {
            user_agent: "BrochureTest/1.0".into(),
            ..FetchConfig::default()
        };
        Mock::given(method("GET"))
            .and(header("user-agent", "BrochureTest/1.0"))
            .and(header_exists("accept-language"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(HOME, "text/html"))
            .mount(&server)
            .await;

        let page = PageFetcher::new(&config)
            .expect("build fetcher")
            .fetch(&server.uri())
            .await
            .expect("request matched browser headers");
        assert_eq!(page.title, "Acme Inc");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, BrochureError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn non_markup_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/logo.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, BrochureError::Parse { .. }));
    }

    #[tokio::test]
    async fn invalid_url_is_fetch_error() {
        let err = fetcher().fetch("/about").await.unwrap_err();
        assert!(matches!(err, BrochureError::Fetch { .. }));
        assert!(err.to_string().contains("invalid URL"));
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let err = fetcher().fetch(&uri).await.unwrap_err();
        assert!(matches!(err, BrochureError::Fetch { .. }));
    }
}
