mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{FakeBackend, FakePage};
use seoscan_lib::{
    BrowserPool, Config, Result, ScanError, ScanOptions, ScanRecord, ScanSink, Scanner,
};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ChannelSink(mpsc::UnboundedSender<ScanRecord>);

#[async_trait]
impl ScanSink for ChannelSink {
    async fn record(&self, record: ScanRecord) -> Result<()> {
        self.0
            .send(record)
            .map_err(|e| ScanError::Config(e.to_string()))
    }
}

fn config() -> Config {
    Config {
        settle_delay: Duration::ZERO,
        ..Config::default()
    }
}

fn scanner(backend: FakeBackend) -> Scanner<FakeBackend> {
    let pool = Arc::new(BrowserPool::new(backend, 2));
    Scanner::new(pool, config()).expect("scanner")
}

fn at(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

fn host(server: &MockServer) -> String {
    server.address().to_string()
}

async fn next_record(rx: &mut mpsc::UnboundedReceiver<ScanRecord>) -> ScanRecord {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("record persisted")
        .expect("channel open")
}

async fn site() -> (MockServer, MockServer) {
    let external = MockServer::start().await;
    Mock::given(path("/partner"))
        .respond_with(ResponseTemplate::new(200).set_body_string("partner"))
        .mount(&external)
        .await;

    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "User-agent: *\nDisallow: /private\nSitemap: https://shop.example/sitemap.xml\n",
        ))
        .mount(&origin)
        .await;
    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&origin)
        .await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/ok"))
        .mount(&origin)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/head-refused"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/head-refused"))
        .respond_with(ResponseTemplate::new(200).set_body_string("get works"))
        .mount(&origin)
        .await;
    (origin, external)
}

fn landing_page(external: &MockServer) -> String {
    format!(
        r#"<html lang="en"><head><title>Landing</title>
        <link rel="canonical" href="/"></head>
        <body><h1>Welcome</h1>
        <a href="/ok">ok</a> <a href="/moved">moved</a> <a href="/head-refused">refused</a>
        <a href="/missing">missing</a>
        <a href="{}">partner</a>
        </body></html>"#,
        at(external, "/partner")
    )
}

const BLOCKED_WITH_AMP: &str = r#"<html><head><title>Attention Required!</title>
    <link rel="amphtml" href="/amp"></head>
    <body><h1>Sorry, you have been blocked</h1></body></html>"#;

#[tokio::test]
async fn scan_collects_render_and_auxiliary_sections() {
    let (origin, external) = site().await;
    let page_url = at(&origin, "/");
    let backend = FakeBackend::new().page(
        &page_url,
        FakePage::ok(landing_page(&external)).with_header("Content-Length", "4321"),
    );
    let stats = backend.stats.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scanner = scanner(backend).with_sink(Arc::new(ChannelSink(tx)));

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.content_length, 4321);
    assert_eq!(result.performance.page_size_bytes, 4321);
    assert_eq!(result.performance.final_url, page_url);
    assert!(!result.performance.https.is_https);
    assert_eq!(result.content().title.as_deref(), Some("Landing"));
    assert!(result.checks().indexable.ok);
    assert_eq!(result.console_logs.len(), 1);

    let crawl = &result.crawl_checks;
    assert_eq!(crawl.robots_url.as_deref(), Some(at(&origin, "/robots.txt").as_str()));
    assert_eq!(crawl.blocked_by_robots, Some(false));
    assert_eq!(crawl.sitemaps.len(), 1);

    let internal = &result.link_checks.internal;
    assert_eq!(internal.len(), 4);
    assert_eq!(internal[0].status, Some(200));
    assert_eq!(internal[1].status, Some(200));
    assert_eq!(internal[1].redirects, 1);
    assert_eq!(internal[1].final_url, at(&origin, "/ok"));
    assert_eq!(internal[2].status, Some(200));
    assert_eq!(internal[3].status, Some(404));
    assert_eq!(result.link_checks.external.len(), 1);
    assert_eq!(result.link_checks.external[0].status, Some(200));

    assert!(!result.pagespeed.enabled);
    assert_eq!(result.performance.mobile_score, None);
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let record = next_record(&mut rx).await;
    assert_eq!(record.url, page_url);
    assert_eq!(record.status_code, 200);
    assert!(!record.is_amp);

    scanner.shutdown().await;
    assert_eq!(stats.opened(), stats.closed());
}

#[tokio::test]
async fn waf_page_falls_back_to_amp_content() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let amp = r#"<html amp><head><title>AMP Landing</title></head><body><h1>Welcome</h1></body></html>"#;
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(BLOCKED_WITH_AMP).with_status(403))
        .page(&amp_url, FakePage::ok(amp));
    let scanner = scanner(backend);

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();

    assert_eq!(result.status_code, 403);
    assert_eq!(result.content().title.as_deref(), Some("AMP Landing"));
    assert_eq!(result.content().headings.h1, vec!["Welcome"]);
    assert!(result
        .notes
        .iter()
        .any(|n| n == "Canonical blocked by WAF; AMP analyzed instead."));
    // Checks and timing stay those of the canonical response.
    assert!(result.checks().indexable.ok);
    assert!(!result.checks().canonical.ok);
    assert!(!scanner.cooldown().is_blocked(&host(&origin)));
}

#[tokio::test]
async fn waf_block_on_both_pages_enters_cooldown() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let blocked = r#"<html><head><link rel="amphtml" href="/amp"></head>
        <body>Access denied. Reference #18.2f</body></html>"#;
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(blocked).with_status(403))
        .page(&amp_url, FakePage::ok("   "));
    let stats = backend.stats.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scanner = scanner(backend).with_sink(Arc::new(ChannelSink(tx)));

    let first = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();
    assert!(first
        .errors
        .iter()
        .any(|e| e == "WAF/CDN blocked both canonical and AMP."));
    assert!(scanner.cooldown().is_blocked(&host(&origin)));
    assert_eq!(next_record(&mut rx).await.status_code, 403);
    let opened = stats.opened();

    let second = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();
    assert_eq!(second.status_code, 0);
    assert!(second.notes[0].starts_with("Temporarily cooled down for"));
    assert_eq!(stats.opened(), opened, "no render while cooled down");

    let cooled = next_record(&mut rx).await;
    assert_eq!(cooled.url, page_url);
    assert_eq!(cooled.status_code, 0);
}

#[tokio::test]
async fn blocked_amp_page_is_not_analyzed() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let amp_blocked = r#"<html><head><title>Blocked AMP</title></head>
        <body><h1>Denied</h1>Access denied. Reference #18.2f</body></html>"#;
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(BLOCKED_WITH_AMP).with_status(403))
        .page(&amp_url, FakePage::ok(amp_blocked).with_status(403));
    let scanner = scanner(backend);

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();

    assert_eq!(result.content().title.as_deref(), Some("Attention Required!"));
    assert!(!result.notes.iter().any(|n| n.contains("AMP analyzed instead")));
    assert!(result
        .errors
        .iter()
        .any(|e| e == "WAF/CDN blocked both canonical and AMP."));
    assert!(scanner.cooldown().remaining(&host(&origin)).is_some());
}

#[tokio::test]
async fn failed_amp_render_enters_cooldown() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(BLOCKED_WITH_AMP).with_status(403))
        .page(&amp_url, FakePage::failing());
    let stats = backend.stats.clone();
    let scanner = scanner(backend);

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();

    assert_eq!(result.status_code, 403);
    assert!(result
        .errors
        .iter()
        .any(|e| e == "WAF/CDN blocked both canonical and AMP."));
    assert!(scanner.cooldown().remaining(&host(&origin)).is_some());
    assert_eq!(stats.opened(), 2);
    assert_eq!(stats.closed(), 2);
}

#[tokio::test]
async fn navigation_failure_is_a_scan_error() {
    let backend = FakeBackend::new().page("https://down.example/", FakePage::failing());
    let stats = backend.stats.clone();
    let scanner = scanner(backend);

    let err = scanner
        .scan("https://down.example/", &ScanOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Navigation { .. }));
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.closed(), 1);
}

#[tokio::test]
async fn wait_token_is_normalized_per_scan() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let backend = FakeBackend::new().page(&page_url, FakePage::ok("<title>t</title>"));
    let stats = backend.stats.clone();
    let scanner = scanner(backend);

    let options = ScanOptions {
        wait_until: Some("DOMReady".into()),
        ..ScanOptions::default()
    };
    scanner.scan(&page_url, &options).await.unwrap();
    assert_eq!(
        stats.navigations()[0].1,
        seoscan_lib::WaitMode::DomContentLoaded
    );
}

#[tokio::test]
async fn amp_compare_reports_rows_and_caches() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let canonical = r#"<html><head><title>Shop</title><meta property="og:title" content="Shop">
        <link rel="amphtml" href="/amp"></head><body><h1>Shop</h1><h1>Deals</h1></body></html>"#;
    let amp = r#"<html amp><head><title>Shop</title></head><body><h1>Shop</h1></body></html>"#;
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(canonical))
        .page(&amp_url, FakePage::ok(amp));
    let stats = backend.stats.clone();
    let scanner = scanner(backend);

    let cmp = scanner.amp_compare(&page_url, &ScanOptions::default()).await.unwrap();
    assert_eq!(cmp.amp_url.as_deref(), Some(amp_url.as_str()));
    assert!(cmp.error.is_none());
    let h1 = cmp.rows.iter().find(|r| r.label == "H1 Count").unwrap();
    assert_eq!((h1.non_amp.as_str(), h1.amp.as_str()), ("2", "1"));
    let og = cmp.rows.iter().find(|r| r.label == "Open Graph present").unwrap();
    assert!(og.changed);
    let title = cmp.rows.iter().find(|r| r.label == "Title").unwrap();
    assert!(!title.changed);

    let opened = stats.opened();
    let again = scanner.amp_compare(&page_url, &ScanOptions::default()).await.unwrap();
    assert_eq!(again, cmp);
    assert_eq!(stats.opened(), opened);
}

#[tokio::test]
async fn amp_compare_without_alternate() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let backend = FakeBackend::new().page(&page_url, FakePage::ok("<title>Plain</title>"));
    let scanner = scanner(backend);

    let cmp = scanner.amp_compare(&page_url, &ScanOptions::default()).await.unwrap();
    assert!(cmp.rows.is_empty());
    assert!(cmp.amp_url.is_none());
    assert_eq!(
        cmp.error.as_deref(),
        Some("No AMP version found via <link rel='amphtml'>.")
    );
}

#[tokio::test]
async fn warm_compare_fills_cache_in_background() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let amp_url = at(&origin, "/amp");
    let canonical = r#"<html><head><title>Shop</title>
        <link rel="amphtml" href="/amp"></head><body><h1>Shop</h1></body></html>"#;
    let amp = r#"<html amp><head><title>Shop AMP</title></head><body><h1>Shop</h1></body></html>"#;
    let backend = FakeBackend::new()
        .page(&page_url, FakePage::ok(canonical))
        .page(&amp_url, FakePage::ok(amp));
    let stats = backend.stats.clone();
    let scanner = Arc::new(scanner(backend));

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();
    let warm = scanner
        .warm_compare(&result, &ScanOptions::default())
        .expect("page has an AMP alternate");
    warm.await.unwrap();
    assert!(scanner.warm_compare(&result, &ScanOptions::default()).is_none());

    let opened = stats.opened();
    let cmp = scanner.amp_compare(&page_url, &ScanOptions::default()).await.unwrap();
    assert_eq!(stats.opened(), opened, "served from cache");
    let title = cmp.rows.iter().find(|r| r.label == "Title").unwrap();
    assert!(title.changed);
}

#[tokio::test]
async fn warm_compare_skips_pages_without_amp() {
    let (origin, _external) = site().await;
    let page_url = at(&origin, "/");
    let backend = FakeBackend::new().page(&page_url, FakePage::ok("<title>Plain</title>"));
    let scanner = Arc::new(scanner(backend));

    let result = scanner.scan(&page_url, &ScanOptions::default()).await.unwrap();
    assert!(scanner.warm_compare(&result, &ScanOptions::default()).is_none());
}
