//! Listing page walker
//!
//! Walks the paginated listing one page at a time, in increasing order, and
//! yields the profile URLs found on each page. The walk ends when the known
//! last page has been passed or after a run of consecutive empty pages.

use crate::config::SiteConfig;
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::parser::ProfileParser;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Profile URLs discovered on one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// Listing page number
    pub page: u32,

    /// Distinct profile URLs, in page order
    pub urls: Vec<String>,
}

impl PageResult {
    /// An empty page may mean the listing has run out
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Lazily walks listing pages
///
/// Call [`PageWalker::next_page`] repeatedly; it returns `None` once the walk
/// is over. A page that fails to fetch counts as an empty page rather than
/// ending the walk.
pub struct PageWalker {
    client: Client,
    limiter: ConcurrencyLimiter,
    parser: Arc<dyn ProfileParser>,
    site: SiteConfig,
    base_url: Url,

    /// Page the next call will fetch
    page: u32,

    /// Last page advertised by the pagination, if known
    max_page: Option<u32>,

    max_empty_pages: u32,
    consecutive_empty: u32,
    finished: bool,
}

impl PageWalker {
    /// Creates a walker starting at `start_page`
    pub fn new(
        client: Client,
        limiter: ConcurrencyLimiter,
        parser: Arc<dyn ProfileParser>,
        site: SiteConfig,
        start_page: u32,
        max_empty_pages: u32,
    ) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&site.base_url)?;
        Ok(Self {
            client,
            limiter,
            parser,
            site,
            base_url,
            page: start_page.max(1),
            max_page: None,
            max_empty_pages: max_empty_pages.max(1),
            consecutive_empty: 0,
            finished: false,
        })
    }

    /// Fetches page 1 once and reads the last page number from its pagination
    ///
    /// On success the hint (if any) bounds the walk. A fetch failure is
    /// returned to the caller, which decides whether it is fatal; the walker
    /// itself stays usable without a bound.
    pub async fn probe_max_page(&mut self) -> Result<Option<u32>, FetchError> {
        let url = self.site.listing_url(1);
        let body = {
            let _permit = self.limiter.acquire().await;
            fetch_page(&self.client, &url).await?
        };

        self.max_page = self.parser.parse_max_page(&body);
        match self.max_page {
            Some(max) => tracing::info!("Pagination advertises {} pages", max),
            None => tracing::info!("No pagination found, walking until empty pages"),
        }
        Ok(self.max_page)
    }

    /// Fetches the next listing page
    ///
    /// Returns `None` when the known last page has been passed or the
    /// configured number of consecutive empty pages has been seen.
    pub async fn next_page(&mut self) -> Option<PageResult> {
        if self.finished {
            return None;
        }

        if let Some(max) = self.max_page {
            if self.page > max {
                tracing::info!("Reached last advertised page {}", max);
                self.finished = true;
                return None;
            }
        }

        if self.consecutive_empty >= self.max_empty_pages {
            tracing::info!(
                "Stopping after {} consecutive empty pages",
                self.consecutive_empty
            );
            self.finished = true;
            return None;
        }

        let page = self.page;
        let urls = self.fetch_listing(page).await;
        self.page += 1;

        if urls.is_empty() {
            self.consecutive_empty += 1;
            tracing::warn!(
                "Page {}: no candidates found ({}/{} empty)",
                page,
                self.consecutive_empty,
                self.max_empty_pages
            );
        } else {
            self.consecutive_empty = 0;
            tracing::info!("Page {}: found {} candidates", page, urls.len());
        }

        Some(PageResult { page, urls })
    }

    /// Fetches and parses one listing page; failures degrade to no URLs
    async fn fetch_listing(&self, page: u32) -> Vec<String> {
        let url = self.site.listing_url(page);
        let result = {
            let _permit = self.limiter.acquire().await;
            fetch_page(&self.client, &url).await
        };

        match result {
            Ok(body) => self.parser.parse_listing(&body, &self.base_url),
            Err(e) => {
                tracing::warn!("Page {}: failed to fetch {}: {}", page, url, e);
                Vec::new()
            }
        }
    }

    /// Last page bound, if known
    pub fn max_page(&self) -> Option<u32> {
        self.max_page
    }

    /// Length of the current run of empty pages
    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }
}
