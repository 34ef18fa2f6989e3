//! Output module for reporting on harvested candidates
//!
//! This module handles reading a checkpointed table back and printing a
//! statistics report for it.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CandidateStatistics, SalaryMix};
