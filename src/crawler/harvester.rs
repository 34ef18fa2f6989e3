//! Profile harvester
//!
//! Fetches and parses a batch of profile pages concurrently. Each fetch holds
//! a limiter slot, so the batch never has more requests in flight than the
//! limiter allows. A failing profile is logged and dropped; it never takes its
//! siblings down with it.

use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::crawler::parser::{ParseError, ProfileParser};
use crate::record::CandidateRecord;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Why a single profile produced no record
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("profile URL is empty")]
    EmptyUrl,
}

/// Result of harvesting one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully parsed candidates, in completion order
    pub records: Vec<CandidateRecord>,

    /// Profiles that answered 404
    pub not_found: usize,

    /// Profiles lost to timeouts, HTTP errors, parse errors, or task failures
    pub failed: usize,
}

impl BatchOutcome {
    fn absorb(&mut self, url: &str, result: Result<CandidateRecord, ProfileError>) {
        match result {
            Ok(record) => self.records.push(record),
            Err(ProfileError::Fetch(e)) if e.is_not_found() => {
                tracing::debug!("Candidate {}: not found", url);
                self.not_found += 1;
            }
            Err(e) => {
                tracing::warn!("Candidate {}: {}", url, e);
                self.failed += 1;
            }
        }
    }
}

/// Concurrent fetch+parse of profile batches
pub struct Harvester {
    client: Client,
    limiter: ConcurrencyLimiter,
    parser: Arc<dyn ProfileParser>,
    batch_size: usize,
    batch_delay: Duration,
}

impl Harvester {
    pub fn new(
        client: Client,
        limiter: ConcurrencyLimiter,
        parser: Arc<dyn ProfileParser>,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            client,
            limiter,
            parser,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Splits a page's URLs into harvest batches
    pub fn batches<'a>(&self, urls: &'a [String]) -> std::slice::Chunks<'a, String> {
        urls.chunks(self.batch_size)
    }

    /// Harvests one batch of profile URLs
    ///
    /// Every URL is fetched and parsed on its own task; the call returns once
    /// all of them have finished. Failures are counted and logged, never
    /// returned.
    pub async fn harvest(&self, urls: &[String]) -> BatchOutcome {
        let mut tasks = JoinSet::new();
        for url in urls {
            let client = self.client.clone();
            let limiter = self.limiter.clone();
            let parser = Arc::clone(&self.parser);
            let url = url.clone();
            tasks.spawn(async move {
                let result = harvest_profile(&client, &limiter, parser.as_ref(), &url).await;
                (url, result)
            });
        }

        let mut outcome = BatchOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, result)) => outcome.absorb(&url, result),
                Err(e) => {
                    tracing::error!("Candidate task failed: {}", e);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Waits out the inter-batch delay, returning early on cancellation
    pub async fn pause(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(self.batch_delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}

/// Fetches and parses a single profile
async fn harvest_profile(
    client: &Client,
    limiter: &ConcurrencyLimiter,
    parser: &dyn ProfileParser,
    url: &str,
) -> Result<CandidateRecord, ProfileError> {
    let body = {
        let _permit = limiter.acquire().await;
        fetch_page(client, url).await?
    };

    let fields = parser.parse_profile(&body)?;
    CandidateRecord::new(url, fields).ok_or(ProfileError::EmptyUrl)
}
