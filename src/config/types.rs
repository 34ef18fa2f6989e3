use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler pacing and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Number of profile URLs harvested together
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Pause after each profile batch (milliseconds)
    #[serde(rename = "batch-delay-ms")]
    pub batch_delay_ms: u64,

    /// Pause after each harvested listing page (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Write a checkpoint every N listing pages
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u32,

    /// Stop after this many consecutive listing pages without profiles
    #[serde(rename = "max-empty-pages")]
    pub max_empty_pages: u32,

    /// First listing page to walk
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Read the last page number from the pagination of page 1 before walking
    #[serde(rename = "probe-max-page")]
    pub probe_max_page: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            batch_size: 15,
            batch_delay_ms: 800,
            page_delay_ms: 1500,
            checkpoint_interval: 5,
            max_empty_pages: 3,
            start_page: 1,
            probe_max_page: true,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Browser user agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Accept-Language header value
    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host of the listing site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated listing
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param")]
    pub page_param: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://busy.az".to_string(),
            listing_path: "/jobseekers".to_string(),
            page_param: "page".to_string(),
        }
    }
}

impl SiteConfig {
    /// Builds the listing URL for a page number
    pub fn listing_url(&self, page: u32) -> String {
        format!(
            "{}{}?{}={}",
            self.base_url.trim_end_matches('/'),
            self.listing_path,
            self.page_param,
            page
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the CSV table of candidates
    #[serde(rename = "csv-path")]
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "busy_az_candidates.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url() {
        let site = SiteConfig::default();
        assert_eq!(site.listing_url(3), "https://busy.az/jobseekers?page=3");
    }

    #[test]
    fn test_listing_url_trailing_slash() {
        let site = SiteConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(site.listing_url(1), "http://127.0.0.1:8080/jobseekers?page=1");
    }
}
