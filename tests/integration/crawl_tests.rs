//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from listing pages to the CSV table.

use jobseeker_harvest::config::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use jobseeker_harvest::crawler::{BusyAzParser, Coordinator, ParseError, ProfileParser};
use jobseeker_harvest::output::load_statistics;
use jobseeker_harvest::record::{CandidateRecord, ProfileFields};
use jobseeker_harvest::storage::{read_table, state_path_for, ResultStore, RunState, RunStatus};
use jobseeker_harvest::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with no pacing
fn create_test_config(base_url: &str, csv_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_requests: 4,
            batch_size: 15,
            batch_delay_ms: 0,
            page_delay_ms: 0,
            checkpoint_interval: 5,
            max_empty_pages: 3,
            start_page: 1,
            probe_max_page: true,
        },
        http: HttpConfig {
            request_timeout_secs: 5,
            connect_timeout_secs: 1,
            ..HttpConfig::default()
        },
        site: SiteConfig {
            base_url: base_url.to_string(),
            ..SiteConfig::default()
        },
        output: OutputConfig {
            csv_path: csv_path.to_string_lossy().into_owned(),
        },
    }
}

/// Listing page linking the given profile ids, with optional pagination
fn listing_page(ids: &[u32], last_page: Option<u32>) -> String {
    let cards: String = ids
        .iter()
        .map(|id| format!(r#"<div class="card"><a href="/jobseeker/{}">Namizəd {}</a></div>"#, id, id))
        .collect();
    let pagination = last_page
        .map(|last| {
            format!(
                r#"<ul class="pagination"><li><a href="/jobseekers?page=2">2</a></li><li><a href="/jobseekers?page={}">{}</a></li></ul>"#,
                last, last
            )
        })
        .unwrap_or_default();
    format!("<html><body>{}{}</body></html>", cards, pagination)
}

fn profile_page(name: &str) -> String {
    format!(
        r#"<html><body>
        <h3>{}</h3>
        <p class="header-under-name">Mühasib</p>
        <table>
          <tr><th>Mobil telefon</th><td>050 123 45 67</td></tr>
          <tr><th>Cins</th><td>Qadın</td></tr>
          <tr><th>Maaş gözləntisi</th><td>800 AZN</td></tr>
        </table>
        </body></html>"#,
        name
    )
}

async fn mount_listing(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/jobseekers"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_profiles(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/jobseeker/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(profile_page("Aysel Məmmədova"))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn seed_record(server: &MockServer, id: u32) -> CandidateRecord {
    CandidateRecord::new(
        format!("{}/jobseeker/{}", server.uri(), id),
        ProfileFields {
            name: "Köhnə namizəd".to_string(),
            ..ProfileFields::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_crawl_deduplicates_across_pages() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_page(&[1, 2, 3, 2], None)).await;
    mount_listing(&server, 2, listing_page(&[3, 4], None)).await;
    // Pages 3.. are unmounted and answer 404, which the walk treats as empty
    mount_profiles(&server, Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");
    let config = create_test_config(&server.uri(), &csv);

    let mut coordinator = Coordinator::new(config, true).expect("Failed to create coordinator");
    let report = coordinator
        .run(CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records, 4);
    assert_eq!(report.harvested, 5, "page 2 repeats candidate 3");
    assert_eq!(report.pages_walked, 5);
    assert_eq!(report.failed, 0);

    let rows = read_table(&csv).unwrap();
    assert_eq!(rows.len(), 4);
    let first_url = format!("{}/jobseeker/1", server.uri());
    let first = rows.iter().find(|r| r.url() == first_url).unwrap();
    assert_eq!(first.fields().name, "Aysel Məmmədova");
    assert_eq!(first.fields().phone_number, "050 123 45 67");

    let state = RunState::load(&state_path_for(&csv)).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.records, 4);
}

#[tokio::test]
async fn test_pagination_bound_and_periodic_checkpoints() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_page(&[1], Some(12))).await;
    for page in 2..=12 {
        mount_listing(&server, page, listing_page(&[page], None)).await;
    }
    Mock::given(method("GET"))
        .and(path("/jobseekers"))
        .and(query_param("page", "13"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[13], None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_profiles(&server, Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");
    let config = create_test_config(&server.uri(), &csv);

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records, 12);
    assert_eq!(report.pages_walked, 12);
    assert_eq!(report.last_page, 12);
    // After pages 5 and 10, then the final one
    assert_eq!(report.checkpoints, 3);
    assert_eq!(report.checkpoint_failures, 0);
}

#[tokio::test]
async fn test_partial_failures_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_page(&[1, 2, 3, 4, 5], None)).await;
    Mock::given(path("/jobseeker/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(path("/jobseeker/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/jobseeker/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;
    mount_profiles(&server, Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");
    let config = create_test_config(&server.uri(), &csv);

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records, 2);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.failed, 2);

    let stats = load_statistics(&csv).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.genders.get("Qadın"), Some(&2));
    assert_eq!(stats.salary_mean, Some(800.0));
}

#[tokio::test]
async fn test_interrupt_during_batch_keeps_its_candidates() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_page(&[1, 2, 3], None)).await;
    Mock::given(path("/jobseekers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[4], None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_profiles(&server, Duration::from_millis(1000)).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");
    let config = create_test_config(&server.uri(), &csv);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(cancel).await.unwrap();

    assert_eq!(report.status, RunStatus::Interrupted);
    assert_eq!(report.pages_walked, 1);
    assert_eq!(report.records, 3, "the in-flight batch must be merged");
    assert_eq!(read_table(&csv).unwrap().len(), 3);

    let state = RunState::load(&state_path_for(&csv)).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_resume_continues_after_last_page() {
    let server = MockServer::start().await;
    Mock::given(path("/jobseekers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[20], None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_listing(&server, 3, listing_page(&[30, 31], None)).await;
    mount_profiles(&server, Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");

    let mut store = ResultStore::new();
    store.add(vec![seed_record(&server, 10)]);
    store.checkpoint(&csv).unwrap();
    let mut state = RunState::start("previous");
    state.status = RunStatus::Interrupted;
    state.last_page = 2;
    state.records = 1;
    state.save(&state_path_for(&csv)).unwrap();

    let config = create_test_config(&server.uri(), &csv);
    let mut coordinator = Coordinator::new(config, false).unwrap();
    assert_eq!(coordinator.start_page(), 3);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records, 3);

    let rows = read_table(&csv).unwrap();
    assert_eq!(rows[0].fields().name, "Köhnə namizəd");
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_unreachable_site_is_fatal_but_keeps_table() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");

    let mut store = ResultStore::new();
    store.add(vec![seed_record(&server, 1), seed_record(&server, 2)]);
    store.checkpoint(&csv).unwrap();
    let mut state = RunState::start("previous");
    state.status = RunStatus::Interrupted;
    state.last_page = 4;
    state.save(&state_path_for(&csv)).unwrap();

    // Bind and drop a listener to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = create_test_config(&format!("http://127.0.0.1:{}", port), &csv);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let result = coordinator.run(CancellationToken::new()).await;

    assert!(matches!(result, Err(HarvestError::Unreachable { .. })), "{:?}", result);
    assert_eq!(read_table(&csv).unwrap().len(), 2);

    let state = RunState::load(&state_path_for(&csv)).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.last_page, 4);
}

#[tokio::test]
async fn test_interrupt_between_batches_keeps_previous_last_page() {
    let server = MockServer::start().await;
    mount_listing(&server, 4, listing_page(&[40, 41, 42, 43, 44], None)).await;
    Mock::given(path("/jobseekers"))
        .and(query_param("page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[50], None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_profiles(&server, Duration::from_millis(1000)).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");

    let mut store = ResultStore::new();
    store.add(vec![seed_record(&server, 10)]);
    store.checkpoint(&csv).unwrap();
    let mut state = RunState::start("previous");
    state.status = RunStatus::Interrupted;
    state.last_page = 3;
    state.records = 1;
    state.save(&state_path_for(&csv)).unwrap();

    let mut config = create_test_config(&server.uri(), &csv);
    config.crawler.batch_size = 2;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let mut coordinator = Coordinator::new(config, false).unwrap();
    assert_eq!(coordinator.start_page(), 4);
    let report = coordinator.run(cancel).await.unwrap();

    // Only the first batch of page 4 ran
    assert_eq!(report.status, RunStatus::Interrupted);
    assert_eq!(report.harvested, 2);
    assert_eq!(report.records, 3);
    assert_eq!(report.last_page, 3);

    let rows = read_table(&csv).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .any(|r| r.url() == format!("{}/jobseeker/40", server.uri())));

    let state = RunState::load(&state_path_for(&csv)).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Interrupted);
    assert_eq!(state.last_page, 3, "a partly harvested page is walked again on resume");
}

/// Busy.az rules, plus removing a directory that blocks the table path once
/// a listing carrying `data-unblock` is parsed
struct UnblockingParser {
    inner: BusyAzParser,
    blocker: PathBuf,
}

impl ProfileParser for UnblockingParser {
    fn parse_listing(&self, html: &str, base_url: &Url) -> Vec<String> {
        if html.contains("data-unblock") {
            std::fs::remove_dir(&self.blocker).unwrap();
        }
        self.inner.parse_listing(html, base_url)
    }

    fn parse_profile(&self, html: &str) -> Result<ProfileFields, ParseError> {
        self.inner.parse_profile(html)
    }

    fn parse_max_page(&self, html: &str) -> Option<u32> {
        self.inner.parse_max_page(html)
    }
}

#[tokio::test]
async fn test_failed_checkpoint_is_retried_at_the_next_one() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_page(&[1], Some(12))).await;
    for page in (2..=12).filter(|p| *p != 6) {
        mount_listing(&server, page, listing_page(&[page], None)).await;
    }
    mount_listing(
        &server,
        6,
        listing_page(&[6], None).replace("<body>", "<body><div data-unblock></div>"),
    )
    .await;
    mount_profiles(&server, Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("candidates.csv");
    // A directory at the table path makes the rename of the checkpoint fail
    std::fs::create_dir(&csv).unwrap();

    let parser = UnblockingParser {
        inner: BusyAzParser::new(),
        blocker: csv.clone(),
    };
    let config = create_test_config(&server.uri(), &csv);
    let mut coordinator = Coordinator::with_parser(config, true, Arc::new(parser)).unwrap();
    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    // Page 5 failed; page 10 and the final checkpoint succeeded
    assert_eq!(report.checkpoint_failures, 1);
    assert_eq!(report.checkpoints, 2);
    assert_eq!(read_table(&csv).unwrap().len(), 12);

    let state = RunState::load(&state_path_for(&csv)).unwrap().unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.records, 12);
}
