//! Jobseeker-Harvest main entry point
//!
//! This is the command-line interface for the job-seeker listing crawler.

use clap::Parser;
use jobseeker_harvest::config::{load_config_with_hash, Config};
use jobseeker_harvest::crawler::crawl;
use jobseeker_harvest::storage::{state_path_for, RunState};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Jobseeker-Harvest: a paced job-seeker listing crawler
///
/// Jobseeker-Harvest walks a paginated candidate listing, fetches every
/// profile under a concurrency cap, and checkpoints the extracted candidates
/// to CSV. Interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "jobseeker-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paced job-seeker listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the candidate table and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jobseeker_harvest=info,warn"),
            1 => EnvFilter::new("jobseeker_harvest=debug,info"),
            2 => EnvFilter::new("jobseeker_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Jobseeker-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Batch delay: {}ms", config.crawler.batch_delay_ms);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!(
        "  Checkpoint every: {} pages",
        config.crawler.checkpoint_interval
    );
    println!("  Stop after empty pages: {}", config.crawler.max_empty_pages);
    println!("  Probe pagination: {}", config.crawler.probe_max_page);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);

    println!("\nSite:");
    println!("  First listing page: {}", config.site.listing_url(config.crawler.start_page));

    println!("\nOutput:");
    println!("  Table: {}", config.output.csv_path);

    let state_path = state_path_for(Path::new(&config.output.csv_path));
    match RunState::load(&state_path)? {
        Some(state) if state.status.is_resumable() => println!(
            "  Resumable {} run: last page {}, {} candidates",
            state.status.as_str(),
            state.last_page,
            state.records
        ),
        Some(state) => println!("  Previous run: {}", state.status.as_str()),
        None => println!("  No previous run"),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the candidate table
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use jobseeker_harvest::output::{load_statistics, print_statistics};

    println!("Table: {}\n", config.output.csv_path);

    let stats = load_statistics(Path::new(&config.output.csv_path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }

    tracing::info!(
        "Listing: {}, concurrency: {}, batch size: {}",
        config.site.listing_url(config.crawler.start_page),
        config.crawler.max_concurrent_requests,
        config.crawler.batch_size
    );

    match crawl(config, fresh, config_hash).await {
        Ok(report) => {
            tracing::info!(
                "Crawl {}: {} candidates saved ({} checkpoints, {} failed profiles)",
                report.status.as_str(),
                report.records,
                report.checkpoints,
                report.failed
            );
            if report.checkpoint_failures > 0 {
                tracing::warn!("{} checkpoint writes failed", report.checkpoint_failures);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
