//! Landing page plus selected pages, gathered into one labeled document.

use futures::{StreamExt, stream};
use tracing::{info, instrument};

use brochure_fetcher::PageFetcher;
use brochure_shared::{AggregatedDocument, Result};

use crate::links::LinkSelector;
use crate::pipeline::{ProgressReporter, SilentProgress};

/// Fetches the root page, asks for relevant links, and fetches those.
#[derive(Clone)]
pub struct ContentAggregator {
    fetcher: PageFetcher,
    selector: LinkSelector,
    concurrency: usize,
}

impl ContentAggregator {
    /// `concurrency` bounds simultaneous fetches of selected pages (min 1).
    pub fn new(fetcher: PageFetcher, selector: LinkSelector, concurrency: usize) -> Self {
        Self {
            fetcher,
            selector,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn aggregate(&self, root_url: &str) -> Result<AggregatedDocument> {
        self.aggregate_with_progress(root_url, &SilentProgress).await
    }

    /// Build the document for `root_url`.
    ///
    /// Sections keep the order the selector returned, whatever order the
    /// fetches finish in. The first failure aborts the whole aggregation.
    #[instrument(skip_all, fields(url = %root_url))]
    pub async fn aggregate_with_progress(
        &self,
        root_url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<AggregatedDocument> {
        // --- Landing page ---
        progress.phase("Fetching landing page");
        let landing = self.fetcher.fetch(root_url).await?;
        progress.page_fetched(&landing.url, 1, 1);

        // --- Link selection ---
        progress.phase("Selecting relevant links");
        let candidates = self.selector.select_links(&landing).await?;
        progress.links_selected(&candidates);

        let mut doc = AggregatedDocument::new(landing);

        // --- Selected pages ---
        if !candidates.is_empty() {
            progress.phase("Fetching selected pages");
        }
        let total = candidates.len();
        let fetches: Vec<_> = candidates
            .iter()
            .map(|candidate| self.fetcher.fetch(&candidate.url))
            .collect();
        let mut pages = stream::iter(fetches).buffered(self.concurrency);

        for (index, candidate) in candidates.iter().enumerate() {
            let Some(page) = pages.next().await else {
                break;
            };
            let page = page?;
            progress.page_fetched(&page.url, index + 1, total);
            doc.push(candidate.kind.clone(), page);
        }

        info!(sections = doc.len(), "aggregation complete");
        Ok(doc)
    }
}
