//! Configuration module
//!
//! Loads, parses, and validates the TOML configuration file. Every key has a
//! default, so an empty file describes a crawl of busy.az with the stock
//! pacing.
//!
//! # Example
//!
//! ```no_run
//! use jobseeker_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Concurrency cap: {}", config.crawler.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
