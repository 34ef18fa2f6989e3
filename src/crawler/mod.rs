//! Crawler module for listing walks and profile harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with error classification
//! - Listing and profile parsing
//! - Global concurrency limiting
//! - Page walking, batch harvesting, and overall crawl coordination

mod coordinator;
mod fetcher;
mod harvester;
mod limiter;
mod parser;
mod walker;

pub use coordinator::{run_crawl, Coordinator, CrawlPhase, CrawlReport, CrawlState};
pub use fetcher::{build_http_client, fetch_page, FetchError};
pub use harvester::{BatchOutcome, Harvester, ProfileError};
pub use limiter::{ConcurrencyLimiter, FetchPermit};
pub use parser::{BusyAzParser, ParseError, ProfileParser};
pub use walker::{PageResult, PageWalker};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load the previous run's table and state unless `fresh` is set
/// 2. Build the HTTP client and probe the listing's pagination
/// 3. Walk listing pages and harvest their profiles in batches
/// 4. Checkpoint periodically and once more on the way out
///
/// Ctrl-C or SIGTERM stops the crawl after the current batch.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore any interrupted run
/// * `config_hash` - Hash of the configuration, recorded in the run state
pub async fn crawl(
    config: Config,
    fresh: bool,
    config_hash: String,
) -> Result<CrawlReport, HarvestError> {
    run_crawl(config, fresh, config_hash).await
}
