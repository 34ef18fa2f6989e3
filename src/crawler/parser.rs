//! HTML parsing for listing and profile pages
//!
//! This module handles:
//! - Extracting profile links from a listing page
//! - Extracting candidate fields from a profile page
//! - Reading the last page number from pagination markup
//!
//! Parsing is pure: no I/O and no state. The crawl engine only sees the
//! [`ProfileParser`] trait, so another site needs only another implementation.

use crate::record::ProfileFields;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Errors produced while extracting a profile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("page body is empty")]
    Empty,

    #[error("page has no profile markup")]
    NotAProfile,
}

/// Site-specific extraction rules used by the crawl engine
pub trait ProfileParser: Send + Sync {
    /// Returns the absolute profile URLs linked from a listing page, in page
    /// order and without duplicates
    fn parse_listing(&self, html: &str, base_url: &Url) -> Vec<String>;

    /// Extracts candidate fields from a profile page
    fn parse_profile(&self, html: &str) -> Result<ProfileFields, ParseError>;

    /// Reads the highest page number advertised by the pagination, if any
    fn parse_max_page(&self, html: &str) -> Option<u32>;
}

/// Extraction rules for busy.az job-seeker pages
///
/// # Profile Field Rules
///
/// | Field | Source |
/// |-------|--------|
/// | name | first `<h3>` |
/// | position | `p.header-under-name` |
/// | mobile_phone, home_phone, email, gender, salary_expectation | `<tr>` rows, `<th>` label → `<td>` value |
/// | skills, desired_positions | `div.sidebar-widget` tag lists, joined with `", "` |
/// | languages, education, work_history | `div.boxed-list` items, joined with `" \| "` |
/// | about | first `<p>` in `div.single-page-section` |
#[derive(Debug, Clone, Default)]
pub struct BusyAzParser;

impl BusyAzParser {
    pub fn new() -> Self {
        Self
    }
}

impl ProfileParser for BusyAzParser {
    fn parse_listing(&self, html: &str, base_url: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for link in select_all(document.root_element(), "a[href]") {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !is_profile_href(href) {
                continue;
            }
            let Ok(absolute) = base_url.join(href.trim()) else {
                continue;
            };
            let absolute = absolute.to_string();
            if seen.insert(absolute.clone()) {
                urls.push(absolute);
            }
        }

        urls
    }

    fn parse_profile(&self, html: &str) -> Result<ProfileFields, ParseError> {
        if html.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let document = Html::parse_document(html);
        let root = document.root_element();

        let has_markup = ["h3", "table", "div.boxed-list", "div.sidebar-widget"]
            .iter()
            .any(|css| first(root, css).is_some());
        if !has_markup {
            return Err(ParseError::NotAProfile);
        }

        let mut fields = ProfileFields::default();

        if let Some(name) = first(root, "h3") {
            fields.name = text_of(name);
        }
        if let Some(position) = first(root, "p.header-under-name") {
            fields.position = text_of(position);
        }

        extract_table_fields(root, &mut fields);
        extract_sidebar_fields(root, &mut fields);
        extract_boxed_lists(root, &mut fields);

        if let Some(about) = first(root, "div.single-page-section").and_then(|s| first(s, "p")) {
            fields.about = text_of(about);
        }

        Ok(fields)
    }

    fn parse_max_page(&self, html: &str) -> Option<u32> {
        let document = Html::parse_document(html);
        let pagination = first(document.root_element(), "ul.pagination")?;

        select_all(pagination, "a[href]")
            .into_iter()
            .filter_map(|a| a.value().attr("href").and_then(page_number))
            .max()
    }
}

/// Label/value rows of the personal-information tables
fn extract_table_fields(root: ElementRef<'_>, fields: &mut ProfileFields) {
    for row in select_all(root, "tr") {
        let (Some(th), Some(td)) = (first(row, "th"), first(row, "td")) else {
            continue;
        };
        let label = text_of(th).to_lowercase();
        let value = text_of(td);

        if label.contains("mobil telefon") {
            if fields.phone_number.is_empty() {
                fields.phone_number = value.clone();
            }
            fields.mobile_phone = value;
        } else if label.contains("ev telefonu") {
            if fields.phone_number.is_empty() {
                fields.phone_number = value.clone();
            }
            fields.home_phone = value;
        } else if label.contains("e-mail") {
            fields.email = value;
        } else if label.contains("cins") {
            fields.gender = value;
        } else if label.contains("maaş") {
            fields.salary_expectation = value;
        }
    }
}

/// Tag lists in the sidebar: skills and desired positions
fn extract_sidebar_fields(root: ElementRef<'_>, fields: &mut ProfileFields) {
    for widget in select_all(root, "div.sidebar-widget") {
        let (Some(heading), Some(tags)) = (first(widget, "h3"), first(widget, "div.task-tags"))
        else {
            continue;
        };
        let heading = text_of(heading).to_lowercase();
        let values = select_all(tags, "span")
            .into_iter()
            .map(text_of)
            .collect::<Vec<_>>()
            .join(", ");

        if heading.contains("bilik") || heading.contains("bacarıq") {
            fields.skills = values;
        } else if heading.contains("ixtisas") && heading.contains("istədiyi") {
            fields.desired_positions = values;
        }
    }
}

/// Boxed sections: languages, education, work history
fn extract_boxed_lists(root: ElementRef<'_>, fields: &mut ProfileFields) {
    for section in select_all(root, "div.boxed-list") {
        let Some(heading) = first(section, "h3") else {
            continue;
        };
        let heading = text_of(heading).to_lowercase();
        let items = select_all(section, "li")
            .into_iter()
            .map(text_of)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");

        if heading.contains("dil") {
            fields.languages = items;
        } else if heading.contains("təhsil") {
            fields.education = items;
        } else if heading.contains("tarixçə") {
            fields.work_history = items;
        }
    }
}

/// Returns true for hrefs of the form `.../jobseeker/<digits>...`
fn is_profile_href(href: &str) -> bool {
    static PROFILE_HREF: OnceLock<Option<Regex>> = OnceLock::new();
    PROFILE_HREF
        .get_or_init(|| Regex::new(r"/jobseeker/\d+").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(href))
}

/// Extracts N from a `page=N` query pair
fn page_number(href: &str) -> Option<u32> {
    static PAGE_PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    let re = PAGE_PARAM
        .get_or_init(|| Regex::new(r"page=(\d+)").ok())
        .as_ref()?;
    re.captures(href)?.get(1)?.as_str().parse().ok()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = scope.select(&selector).next();
    found
}

/// Element text with runs of whitespace collapsed to single spaces
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
