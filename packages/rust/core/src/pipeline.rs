//! End-to-end brochure generation: URL → landing page → links → pages → brochure stream.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{Instrument, info, info_span, instrument};
use uuid::Uuid;

use brochure_fetcher::PageFetcher;
use brochure_llm::{OpenAiClient, TextGenerator};
use brochure_shared::{
    ApiKey, AppConfig, BrochureConfig, FetchConfig, LinkCandidate, ModelConfig, Page, Result,
};

use crate::aggregate::ContentAggregator;
use crate::links::LinkSelector;
use crate::synthesize::BrochureSynthesizer;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page fetch; `current` counts from 1.
    fn page_fetched(&self, url: &str, current: usize, total: usize);
    /// Called once the model has picked the links to follow.
    fn links_selected(&self, links: &[LinkCandidate]);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn links_selected(&self, _links: &[LinkCandidate]) {}
}

/// Everything one brochure request needs, built once at startup.
///
/// Cheap to clone; concurrent requests share the HTTP pools and nothing else.
#[derive(Clone)]
pub struct BrochureContext {
    fetcher: PageFetcher,
    generator: Arc<dyn TextGenerator>,
    concurrency: usize,
    config: BrochureConfig,
}

impl BrochureContext {
    pub fn new(
        fetcher: PageFetcher,
        generator: Arc<dyn TextGenerator>,
        concurrency: usize,
        config: BrochureConfig,
    ) -> Self {
        Self {
            fetcher,
            generator,
            concurrency,
            config,
        }
    }

    /// Build the fetcher and the OpenAI-compatible client from `config`.
    ///
    /// `api_key` must already be validated (see `resolve_api_key`).
    pub fn from_config(config: &AppConfig, api_key: ApiKey) -> Result<Self> {
        let fetch = FetchConfig::from(config);
        let fetcher = PageFetcher::new(&fetch)?;
        let client = OpenAiClient::new(&ModelConfig::from(config), api_key)?;

        Ok(Self::new(
            fetcher,
            Arc::new(client),
            fetch.concurrency,
            BrochureConfig::from(config),
        ))
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    pub fn link_selector(&self) -> LinkSelector {
        LinkSelector::new(Arc::clone(&self.generator))
    }

    pub fn aggregator(&self) -> ContentAggregator {
        ContentAggregator::new(self.fetcher.clone(), self.link_selector(), self.concurrency)
    }

    pub fn synthesizer(&self) -> BrochureSynthesizer {
        BrochureSynthesizer::new(
            self.aggregator(),
            Arc::clone(&self.generator),
            self.config.clone(),
        )
    }

    /// Fetch `url` and return it with the links the model would follow.
    #[instrument(skip(self))]
    pub async fn select_links(&self, url: &str) -> Result<(Page, Vec<LinkCandidate>)> {
        let page = self.fetcher.fetch(url).await?;
        let links = self.link_selector().select_links(&page).await?;
        Ok((page, links))
    }

    /// Stream the brochure for `company_name` built from `url`.
    ///
    /// Nothing happens until the stream is first polled. A failure before
    /// streaming starts is the only item; afterwards items are the growing
    /// brochure text.
    pub fn generate_brochure(
        &self,
        company_name: &str,
        url: &str,
    ) -> BoxStream<'static, Result<String>> {
        self.generate_brochure_with_progress(company_name, url, Arc::new(SilentProgress))
    }

    pub fn generate_brochure_with_progress(
        &self,
        company_name: &str,
        url: &str,
        progress: Arc<dyn ProgressReporter>,
    ) -> BoxStream<'static, Result<String>> {
        let synthesizer = self.synthesizer();
        let company_name = company_name.to_string();
        let url = url.to_string();

        let request_id = Uuid::now_v7();
        let span = info_span!("generate_brochure", %request_id, company = %company_name, url = %url);

        let setup = async move {
            info!("starting brochure generation");
            synthesizer
                .synthesize_with_progress(&company_name, &url, progress.as_ref())
                .await
        }
        .instrument(span);

        stream::once(setup).try_flatten().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brochure_llm::mock::MockGenerator;
    use brochure_shared::BrochureError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn acme_site() -> MockServer {
        let server = MockServer::start().await;
        let home = r#"<html><head><title>Acme Inc</title></head>
            <body><p>We make anvils.</p><a href="/about">About</a><a href="/careers">Careers</a></body></html>"#;
        let about = "<html><head><title>About</title></head><body><p>Since 1949.</p></body></html>";
        let careers = "<html><head><title>Careers</title></head><body><p>Hiring smiths.</p></body></html>";
        for (route, html) in [("/", home), ("/about", about), ("/careers", careers)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
                .mount(&server)
                .await;
        }
        server
    }

    fn context(mock: Arc<MockGenerator>) -> BrochureContext {
        let fetcher = PageFetcher::new(&FetchConfig::default()).expect("build fetcher");
        BrochureContext::new(fetcher, mock, 4, BrochureConfig::default())
    }

    fn acme_mock(server: &MockServer) -> Arc<MockGenerator> {
        let selection = json!({
            "links": [
                { "type": "about page", "url": format!("{}/about", server.uri()) },
                { "type": "careers page", "url": format!("{}/careers", server.uri()) },
            ]
        });
        Arc::new(
            MockGenerator::new()
                .with_completion(selection.to_string())
                .with_fragments(["# Acme", "\nGreat culture."]),
        )
    }

    #[tokio::test]
    async fn streams_growing_brochure() {
        let server = acme_site().await;
        let mock = acme_mock(&server);
        let ctx = context(mock.clone());

        let values: Vec<String> = ctx
            .generate_brochure("Acme", &server.uri())
            .try_collect()
            .await
            .expect("brochure");
        assert_eq!(values, vec!["# Acme", "# Acme\nGreat culture."]);

        let calls = mock.calls();
        let prompt = &calls[1].messages()[1].content;
        let about = prompt.find("\n\nabout page\n").expect("about section");
        let careers = prompt.find("\n\ncareers page\n").expect("careers section");
        assert!(prompt.find("Landing page:\n").expect("landing section") < about);
        assert!(about < careers);
    }

    #[tokio::test]
    async fn nothing_happens_until_polled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mock = Arc::new(MockGenerator::new());
        let ctx = context(mock.clone());
        let stream = ctx.generate_brochure("Acme", &server.uri());
        drop(stream);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn generation_is_deterministic() {
        let server = acme_site().await;
        let mut finals = Vec::new();
        for _ in 0..2 {
            let ctx = context(acme_mock(&server));
            let values: Vec<String> = ctx
                .generate_brochure("Acme", &server.uri())
                .try_collect()
                .await
                .expect("brochure");
            finals.push(values.last().cloned().expect("final text"));
        }
        assert_eq!(finals[0], finals[1]);
    }

    #[tokio::test]
    async fn setup_failure_is_the_only_item() {
        let server = acme_site().await;
        let mock = Arc::new(MockGenerator::new().with_completion("{\"links\": \"nope\"}"));
        let ctx = context(mock.clone());

        let items: Vec<Result<String>> = ctx.generate_brochure("Acme", &server.uri()).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(BrochureError::Schema { .. })));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_earlier_text() {
        let server = acme_site().await;
        let selection = json!({ "links": [] }).to_string();
        let mock = Arc::new(
            MockGenerator::new()
                .with_completion(selection)
                .with_fragments(["# Acme", "\nGreat culture."])
                .with_stream_failure(1, "connection reset"),
        );
        let ctx = context(mock);

        let items: Vec<Result<String>> = ctx.generate_brochure("Acme", &server.uri()).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().expect("first value"), "# Acme");
        assert!(matches!(items[1], Err(BrochureError::Model(_))));
    }

    #[tokio::test]
    async fn select_links_reports_page_and_candidates() {
        let server = acme_site().await;
        let ctx = context(acme_mock(&server));

        let (page, links) = ctx.select_links(&server.uri()).await.expect("links");
        assert_eq!(page.title, "Acme Inc");
        assert_eq!(page.outbound_links, vec!["/about", "/careers"]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].kind, "careers page");
    }
}
