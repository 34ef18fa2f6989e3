//! Statistics generation from the candidate table
//!
//! This module reads a checkpointed table back and summarizes the candidate
//! pool: demographics, salary expectations, language skills, profile
//! completeness, and contact availability.

use crate::record::CandidateRecord;
use crate::storage::{read_table, StorageError};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

/// Label used for candidates without a gender
pub const UNKNOWN_GENDER: &str = "Məlum deyil";

/// Label for positions matching no category keyword
pub const OTHER_CATEGORY: &str = "Digər";

/// Upper bounds of the salary buckets; the last bucket is open-ended
const SALARY_BUCKETS: [(f64, &str); 4] = [
    (500.0, "0-500"),
    (1000.0, "500-1000"),
    (1500.0, "1000-1500"),
    (2000.0, "1500-2000"),
];
const TOP_SALARY_BUCKET: &str = "2000+";

const TOP_POSITIONS: usize = 15;

/// Positions need this many numeric salaries to get an average
const MIN_POSITION_SALARIES: usize = 3;

/// Category keywords, matched in order against the lower-cased position
const POSITION_CATEGORIES: &[(&str, &[&str])] = &[
    ("Satış", &["satış", "sales"]),
    ("Maliyyə və Mühasibat", &["mühasib", "account"]),
    ("Mühəndislik", &["mühəndis", "engineer"]),
    ("Marketinq", &["marketing", "smm", "brand"]),
    ("İT və Proqramlaşdırma", &["developer", "proqramçı", "programmer"]),
    ("Dizayn", &["dizayn", "design"]),
    ("Hüquq", &["hüquq", "lawyer"]),
    ("Nəqliyyat", &["sürücü", "driver"]),
    ("İnşaat", &["konstruktor"]),
    ("İnsan Resursları", &["hr", "insan resurs"]),
];

/// Language labels and the substrings that identify them
const LANGUAGES: &[(&str, &[&str])] = &[
    ("İngilis", &["İngilis", "English"]),
    ("Rus", &["Rus", "Russian"]),
    ("Azərbaycan", &["Azərbaycan"]),
    ("Türk", &["Türk"]),
];

/// Fields whose fill rate measures profile completeness
const COMPLETENESS_FIELDS: [&str; 5] = ["skills", "languages", "education", "work_history", "about"];

/// Contact fields whose fill rate is reported
const CONTACT_FIELDS: [&str; 3] = ["mobile_phone", "home_phone", "email"];

/// Negotiable versus specific salary counts for one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalaryMix {
    pub negotiable: usize,
    pub specific: usize,
}

impl SalaryMix {
    /// Share of the group leaving salary to negotiation, in percent
    pub fn negotiable_percent(&self) -> f64 {
        let total = self.negotiable + self.specific;
        if total == 0 {
            0.0
        } else {
            self.negotiable as f64 / total as f64 * 100.0
        }
    }
}

/// Candidate pool summary
#[derive(Debug, Clone, Default)]
pub struct CandidateStatistics {
    /// Number of candidates in the table
    pub total: usize,

    /// Candidates per gender label
    pub genders: HashMap<String, usize>,

    /// Most common positions, most frequent first
    pub top_positions: Vec<(String, usize)>,

    /// Candidates leaving salary to negotiation
    pub salary_negotiable: usize,

    /// Candidates naming a concrete amount
    pub salary_specific: usize,

    /// Mean of the numeric salary expectations, if any
    pub salary_mean: Option<f64>,

    /// Candidates per salary bucket, in bucket order
    pub salary_buckets: Vec<(&'static str, usize)>,

    /// Mean numeric salary and sample size per position, highest first
    pub salary_by_position: Vec<(String, f64, usize)>,

    /// Salary negotiability per gender label
    pub salary_by_gender: BTreeMap<String, SalaryMix>,

    /// Candidates per language
    pub languages: Vec<(&'static str, usize)>,

    /// Candidates per number of known languages (zero excluded)
    pub multilingual: BTreeMap<usize, usize>,

    /// Filled count per completeness field
    pub completeness: Vec<(&'static str, usize)>,

    /// Filled count per contact field
    pub contacts: Vec<(&'static str, usize)>,

    /// Candidates per position category, most frequent first
    pub categories: Vec<(String, usize)>,
}

impl CandidateStatistics {
    /// Summarizes a set of candidates
    pub fn from_records(records: &[CandidateRecord]) -> Self {
        let mut genders: HashMap<String, usize> = HashMap::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut categories: HashMap<&str, usize> = HashMap::new();
        let mut salaries = Vec::new();
        let mut position_salaries: HashMap<&str, Vec<f64>> = HashMap::new();
        let mut salary_by_gender: BTreeMap<String, SalaryMix> = BTreeMap::new();
        let mut negotiable = 0;
        let mut language_counts = vec![0usize; LANGUAGES.len()];
        let mut multilingual = BTreeMap::new();

        for record in records {
            let fields = record.fields();

            let gender = if fields.gender.is_empty() {
                UNKNOWN_GENDER
            } else {
                fields.gender.as_str()
            };
            *genders.entry(gender.to_string()).or_default() += 1;

            if !fields.position.is_empty() && !fields.position.contains("yaş") {
                *positions.entry(fields.position.as_str()).or_default() += 1;
            }
            *categories
                .entry(categorize_position(&fields.position))
                .or_default() += 1;

            let mix = salary_by_gender.entry(gender.to_string()).or_default();
            if is_negotiable(&fields.salary_expectation) {
                negotiable += 1;
                mix.negotiable += 1;
            } else {
                mix.specific += 1;
            }
            if let Some(value) = extract_numeric_salary(&fields.salary_expectation) {
                salaries.push(value);
                if !fields.position.is_empty() && !fields.position.contains("yaş") {
                    position_salaries
                        .entry(fields.position.as_str())
                        .or_default()
                        .push(value);
                }
            }

            let known = extract_languages(&fields.languages);
            for language in &known {
                if let Some(i) = LANGUAGES.iter().position(|(label, _)| label == language) {
                    language_counts[i] += 1;
                }
            }
            if !known.is_empty() {
                *multilingual.entry(known.len()).or_default() += 1;
            }
        }

        let filled = |column: &str| {
            records
                .iter()
                .filter(|r| r.get(column).map_or(false, |v| !v.is_empty()))
                .count()
        };

        Self {
            total: records.len(),
            genders,
            top_positions: ranked(positions, TOP_POSITIONS),
            salary_negotiable: negotiable,
            salary_specific: records.len() - negotiable,
            salary_mean: mean(&salaries),
            salary_buckets: bucket_salaries(&salaries),
            salary_by_position: average_by_position(position_salaries),
            salary_by_gender,
            languages: LANGUAGES
                .iter()
                .zip(language_counts)
                .map(|((label, _), count)| (*label, count))
                .collect(),
            multilingual,
            completeness: COMPLETENESS_FIELDS
                .iter()
                .map(|field| (*field, filled(field)))
                .collect(),
            contacts: CONTACT_FIELDS
                .iter()
                .map(|field| (*field, filled(field)))
                .collect(),
            categories: ranked(categories, usize::MAX),
        }
    }

    /// Percentage of all candidates
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// Loads statistics from a candidate table
///
/// # Arguments
///
/// * `path` - The CSV table written by the crawler
///
/// # Returns
///
/// * `Ok(CandidateStatistics)` - Successfully computed statistics
/// * `Err(StorageError)` - The table could not be read
pub fn load_statistics(path: &Path) -> Result<CandidateStatistics, StorageError> {
    let records = read_table(path)?;
    Ok(CandidateStatistics::from_records(&records))
}

/// True when the salary is left to negotiation
///
/// That is the case when it is empty, mentions "Razılaşma", or is the bare
/// currency.
pub fn is_negotiable(salary: &str) -> bool {
    let salary = salary.trim();
    salary.is_empty() || salary.contains("Razılaşma") || salary == "AZN"
}

/// Mean of the numbers in a salary text, e.g. 750 for "500-1000 AZN"
pub fn extract_numeric_salary(salary: &str) -> Option<f64> {
    if is_negotiable(salary) {
        return None;
    }
    mean(&numbers_in(salary))
}

/// Languages named in a languages field
pub fn extract_languages(languages: &str) -> Vec<&'static str> {
    LANGUAGES
        .iter()
        .filter(|(_, needles)| needles.iter().any(|n| languages.contains(n)))
        .map(|(label, _)| *label)
        .collect()
}

/// Job category of a position title
pub fn categorize_position(position: &str) -> &'static str {
    let lower = position.to_lowercase();
    POSITION_CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(OTHER_CATEGORY, |(label, _)| *label)
}

/// Decimal numbers in `text`, e.g. [500.0, 1000.5] for "500-1000.5"
fn numbers_in(text: &str) -> Vec<f64> {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = NUMBER
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    re.find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Right-closed buckets: 500 falls in "0-500"; values of 0 or less are skipped
fn bucket_salaries(salaries: &[f64]) -> Vec<(&'static str, usize)> {
    let mut counts: Vec<(&'static str, usize)> = SALARY_BUCKETS
        .iter()
        .map(|(_, label)| (*label, 0))
        .chain(std::iter::once((TOP_SALARY_BUCKET, 0)))
        .collect();

    for &value in salaries.iter().filter(|v| **v > 0.0) {
        let index = SALARY_BUCKETS
            .iter()
            .position(|(upper, _)| value <= *upper)
            .unwrap_or(SALARY_BUCKETS.len());
        counts[index].1 += 1;
    }

    counts
}

/// Mean salary per position with enough samples, highest first, top 15
fn average_by_position(salaries: HashMap<&str, Vec<f64>>) -> Vec<(String, f64, usize)> {
    let mut averages: Vec<(String, f64, usize)> = salaries
        .into_iter()
        .filter(|(_, values)| values.len() >= MIN_POSITION_SALARIES)
        .filter_map(|(position, values)| {
            mean(&values).map(|m| (position.to_string(), m, values.len()))
        })
        .collect();
    averages.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    averages.truncate(TOP_POSITIONS);
    averages
}

/// Sorts counts descending, ties by label, and keeps the first `limit`
fn ranked<K: ToString>(counts: HashMap<K, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CandidateStatistics) {
    println!("=== Candidate Statistics ===\n");

    println!("Overview:");
    println!("  Total candidates: {}", stats.total);
    println!();

    println!("Gender:");
    let mut genders: Vec<_> = stats.genders.iter().collect();
    genders.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (gender, count) in genders {
        println!("  {}: {} ({:.1}%)", gender, count, stats.percent(*count));
    }
    println!();

    if !stats.top_positions.is_empty() {
        println!("Top Positions:");
        for (position, count) in &stats.top_positions {
            println!("  {}: {}", position, count);
        }
        println!();
    }

    println!("Salary Expectations:");
    println!(
        "  Negotiable: {} ({:.1}%)",
        stats.salary_negotiable,
        stats.percent(stats.salary_negotiable)
    );
    println!(
        "  Specific amount: {} ({:.1}%)",
        stats.salary_specific,
        stats.percent(stats.salary_specific)
    );
    if let Some(mean) = stats.salary_mean {
        println!("  Mean expectation: {:.0} AZN", mean);
    }
    for (bucket, count) in &stats.salary_buckets {
        println!("  {} AZN: {}", bucket, count);
    }
    println!();

    if !stats.salary_by_position.is_empty() {
        println!("Average Salary by Position:");
        for (position, mean, count) in &stats.salary_by_position {
            println!("  {}: {:.0} AZN (n={})", position, mean, count);
        }
        println!();
    }

    println!("Salary Negotiability by Gender:");
    for (gender, mix) in &stats.salary_by_gender {
        println!(
            "  {}: {:.1}% negotiable, {:.1}% specific",
            gender,
            mix.negotiable_percent(),
            100.0 - mix.negotiable_percent()
        );
    }
    println!();

    println!("Languages:");
    let mut languages = stats.languages.clone();
    languages.sort_by(|a, b| b.1.cmp(&a.1));
    for (language, count) in languages {
        println!("  {}: {} ({:.1}%)", language, count, stats.percent(count));
    }
    let speakers: usize = stats.multilingual.values().sum();
    for (known, count) in &stats.multilingual {
        let share = if speakers > 0 {
            *count as f64 / speakers as f64 * 100.0
        } else {
            0.0
        };
        println!("  {} language(s): {} ({:.1}%)", known, count, share);
    }
    println!();

    println!("Profile Completeness:");
    for (field, count) in &stats.completeness {
        println!("  {}: {:.1}%", field, stats.percent(*count));
    }
    println!();

    println!("Contact Availability:");
    for (field, count) in &stats.contacts {
        println!("  {}: {:.1}% ({})", field, stats.percent(*count), count);
    }
    println!();

    println!("Position Categories:");
    for (category, count) in &stats.categories {
        println!("  {}: {}", category, count);
    }
}
