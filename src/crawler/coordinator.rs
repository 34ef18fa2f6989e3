//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the harvest, including:
//! - Resolving the resume point and the pagination bound
//! - Walking listing pages and harvesting their profiles in batches
//! - Merging each page's candidates into the result store
//! - Periodic and final checkpoints
//! - Cooperative cancellation
//!
//! # Phases
//!
//! ```text
//! Starting -> Walking -> Harvesting -> Checkpointing -> Walking ... -> Draining -> Stopped
//! ```
//!
//! Cancellation is observed between pages and between batches. A batch that
//! has started always runs to completion and its candidates are merged before
//! the final checkpoint.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::harvester::Harvester;
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::parser::{BusyAzParser, ProfileParser};
use crate::crawler::walker::{PageResult, PageWalker};
use crate::record::CandidateRecord;
use crate::storage::{state_path_for, ResultStore, RunState, RunStatus};
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Where the coordinator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Starting,
    Walking,
    Harvesting,
    Checkpointing,
    Draining,
    Stopped,
}

/// Progress of the current run
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub phase: CrawlPhase,

    /// Listing page most recently walked
    pub current_page: u32,

    pub consecutive_empty: u32,
    pub pages_walked: u32,

    /// Candidates merged during this run (repeats included)
    pub harvested: usize,

    pub not_found: usize,
    pub failed: usize,
    pub checkpoints: u32,
    pub checkpoint_failures: u32,
    pub started_at: Instant,
}

impl CrawlState {
    fn new() -> Self {
        Self {
            phase: CrawlPhase::Starting,
            current_page: 0,
            consecutive_empty: 0,
            pages_walked: 0,
            harvested: 0,
            not_found: 0,
            failed: 0,
            checkpoints: 0,
            checkpoint_failures: 0,
            started_at: Instant::now(),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub status: RunStatus,
    pub pages_walked: u32,

    /// Last page whose candidates were fully merged
    pub last_page: u32,

    /// Distinct candidates in the final table
    pub records: usize,

    pub harvested: usize,
    pub not_found: usize,
    pub failed: usize,

    /// Successful checkpoint writes, the final one included
    pub checkpoints: u32,
    pub checkpoint_failures: u32,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    parser: Arc<dyn ProfileParser>,
    store: ResultStore,
    run_state: RunState,
    state: CrawlState,
    csv_path: PathBuf,
    state_path: PathBuf,
    start_page: u32,
}

impl Coordinator {
    /// Creates a new coordinator using the busy.az parser
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Ignore any interrupted run and start over
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The previous run's files could not be read
    pub fn new(config: Config, fresh: bool) -> Result<Self, HarvestError> {
        Self::with_parser(config, fresh, Arc::new(BusyAzParser::new()))
    }

    /// Creates a new coordinator with a custom profile parser
    pub fn with_parser(
        config: Config,
        fresh: bool,
        parser: Arc<dyn ProfileParser>,
    ) -> Result<Self, HarvestError> {
        let csv_path = PathBuf::from(&config.output.csv_path);
        let state_path = state_path_for(&csv_path);

        let previous = if fresh {
            tracing::info!("Starting fresh run (ignoring previous state)");
            None
        } else {
            RunState::load(&state_path)?
        };

        let (store, run_state, start_page) = match previous {
            Some(prev) if prev.status.is_resumable() => {
                let store = ResultStore::load(&csv_path)?;
                let start_page = if prev.last_page > 0 {
                    prev.last_page + 1
                } else {
                    config.crawler.start_page
                };
                tracing::info!(
                    "Resuming {} run from page {} with {} candidates",
                    prev.status.as_str(),
                    start_page,
                    store.len()
                );
                let run_state = RunState {
                    status: RunStatus::Running,
                    ..prev
                };
                (store, run_state, start_page)
            }
            Some(_) => {
                tracing::info!("Previous run completed, starting new run");
                (ResultStore::new(), RunState::start(""), config.crawler.start_page)
            }
            None => (ResultStore::new(), RunState::start(""), config.crawler.start_page),
        };

        Ok(Self {
            config: Arc::new(config),
            parser,
            store,
            run_state,
            state: CrawlState::new(),
            csv_path,
            state_path,
            start_page,
        })
    }

    /// Records the configuration hash in the run state
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.run_state.config_hash = hash.into();
        self
    }

    /// Runs the crawl until the listing is exhausted or `cancel` fires
    ///
    /// A final checkpoint is always attempted, including when startup fails.
    /// It never replaces an existing table with an empty one.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run completed or was interrupted
    /// * `Err(HarvestError)` - The HTTP client could not be built or the site
    ///   was unreachable at startup
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<CrawlReport, HarvestError> {
        tracing::info!(
            "Starting crawl at page {} ({} candidates already held)",
            self.start_page,
            self.store.len()
        );
        self.state = CrawlState::new();

        let (mut walker, harvester) = match self.start(&cancel).await {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!("Crawl could not start: {}", e);
                self.drain(RunStatus::Failed);
                return Err(e);
            }
        };

        let status = self.walk(&mut walker, &harvester, &cancel).await;
        self.drain(status);

        Ok(self.report())
    }

    /// Builds the HTTP stack and resolves the pagination bound
    async fn start(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(PageWalker, Harvester), HarvestError> {
        let crawler = &self.config.crawler;
        let client = build_http_client(&self.config.http)?;
        let limiter = ConcurrencyLimiter::new(crawler.max_concurrent_requests as usize);

        let mut walker = PageWalker::new(
            client.clone(),
            limiter.clone(),
            Arc::clone(&self.parser),
            self.config.site.clone(),
            self.start_page,
            crawler.max_empty_pages,
        )?;

        if crawler.probe_max_page && !cancel.is_cancelled() {
            match walker.probe_max_page().await {
                Ok(_) => {}
                Err(e) if e.is_connection() => {
                    return Err(HarvestError::Unreachable {
                        url: self.config.site.listing_url(1),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Could not read pagination, walking without bound: {}", e);
                }
            }
        }

        let harvester = Harvester::new(
            client,
            limiter,
            Arc::clone(&self.parser),
            crawler.batch_size,
            Duration::from_millis(crawler.batch_delay_ms),
        );

        Ok((walker, harvester))
    }

    /// Walks pages until the walker runs out or cancellation is observed
    async fn walk(
        &mut self,
        walker: &mut PageWalker,
        harvester: &Harvester,
        cancel: &CancellationToken,
    ) -> RunStatus {
        let interval = self.config.crawler.checkpoint_interval.max(1);
        let page_delay = Duration::from_millis(self.config.crawler.page_delay_ms);

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Stop requested, draining");
                return RunStatus::Interrupted;
            }

            self.state.phase = CrawlPhase::Walking;
            let Some(page) = walker.next_page().await else {
                return RunStatus::Completed;
            };
            self.state.current_page = page.page;
            self.state.consecutive_empty = walker.consecutive_empty();
            self.state.pages_walked += 1;

            if page.is_empty() {
                self.run_state.last_page = page.page;
                continue;
            }

            self.state.phase = CrawlPhase::Harvesting;
            let (records, complete) = self.harvest_page(harvester, &page, cancel).await;

            let page_count = records.len();
            self.state.harvested += page_count;
            self.store.add(records);
            tracing::info!(
                "Page {}: scraped {} candidates (total: {})",
                page.page,
                page_count,
                self.store.len()
            );

            if !complete {
                tracing::info!("Stop requested during page {}, draining", page.page);
                return RunStatus::Interrupted;
            }
            self.run_state.last_page = page.page;

            if page.page % interval == 0 {
                self.checkpoint();
            }

            tokio::select! {
                _ = tokio::time::sleep(page_delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    /// Harvests a page's profiles batch by batch
    ///
    /// Returns the candidates collected and whether every batch ran. A batch
    /// already started is never cut short.
    async fn harvest_page(
        &mut self,
        harvester: &Harvester,
        page: &PageResult,
        cancel: &CancellationToken,
    ) -> (Vec<CandidateRecord>, bool) {
        let mut records = Vec::with_capacity(page.urls.len());

        for batch in harvester.batches(&page.urls) {
            if cancel.is_cancelled() {
                return (records, false);
            }

            let outcome = harvester.harvest(batch).await;
            self.state.not_found += outcome.not_found;
            self.state.failed += outcome.failed;
            records.extend(outcome.records);

            harvester.pause(cancel).await;
        }

        (records, true)
    }

    /// Writes the table and the run state
    ///
    /// Failures are logged and counted; the next scheduled checkpoint retries.
    /// An empty store leaves the table on disk as it is and only records the
    /// run state.
    fn checkpoint(&mut self) {
        let previous = self.state.phase;
        self.state.phase = CrawlPhase::Checkpointing;

        if self.store.is_empty() {
            tracing::info!(
                "No candidates to save, leaving {} untouched",
                self.csv_path.display()
            );
            self.save_run_state();
            self.state.phase = previous;
            return;
        }

        match self.store.checkpoint(&self.csv_path) {
            Ok(()) => {
                self.state.checkpoints += 1;
                tracing::info!(
                    "Progress saved: {} candidates to {}",
                    self.store.len(),
                    self.csv_path.display()
                );

                self.save_run_state();
            }
            Err(e) => {
                self.state.checkpoint_failures += 1;
                tracing::error!("Checkpoint failed, will retry at next checkpoint: {}", e);
            }
        }

        self.state.phase = previous;
    }

    fn save_run_state(&mut self) {
        self.run_state.records = self.store.len();
        if let Err(e) = self.run_state.save(&self.state_path) {
            tracing::warn!("Failed to save run state: {}", e);
        }
    }

    /// Final checkpoint, attempted on every exit path
    fn drain(&mut self, status: RunStatus) {
        self.state.phase = CrawlPhase::Draining;
        self.run_state.status = status;
        self.checkpoint();
        self.state.phase = CrawlPhase::Stopped;

        tracing::info!(
            "Crawl {} in {:.2?}: {} candidates, {} pages walked, {} failed, {} not found",
            status.as_str(),
            self.state.started_at.elapsed(),
            self.store.len(),
            self.state.pages_walked,
            self.state.failed,
            self.state.not_found
        );
    }

    fn report(&self) -> CrawlReport {
        CrawlReport {
            status: self.run_state.status,
            pages_walked: self.state.pages_walked,
            last_page: self.run_state.last_page,
            records: self.store.len(),
            harvested: self.state.harvested,
            not_found: self.state.not_found,
            failed: self.state.failed,
            checkpoints: self.state.checkpoints,
            checkpoint_failures: self.state.checkpoint_failures,
            elapsed: self.state.started_at.elapsed(),
        }
    }

    /// Accumulated candidates
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Progress of the current run
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Page the crawl starts (or resumes) at
    pub fn start_page(&self) -> u32 {
        self.start_page
    }
}

/// Runs the main crawl operation
///
/// Builds a coordinator, installs Ctrl-C / SIGTERM handlers that cancel the
/// crawl cooperatively, and runs it to completion.
///
/// # Example
///
/// ```no_run
/// use jobseeker_harvest::config::load_config;
/// use jobseeker_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(config, false, String::new()).await?;
/// println!("{} candidates", report.records);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    config_hash: String,
) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::new(config, fresh)?.with_config_hash(config_hash);

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = coordinator.run(cancel).await;
    signal_task.abort();
    result
}

/// Cancels `cancel` on the first Ctrl-C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt signal, finishing current batch and saving progress");
        }
        _ = wait_for_sigterm() => {
            tracing::info!("Received SIGTERM, finishing current batch and saving progress");
        }
    }
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
