use std::collections::BTreeMap;

use seoscan_lib::{extract, looks_like_waf};

const ARTICLE: &str = include_str!("fixtures/article.html");
const BLOCKED: &str = include_str!("fixtures/blocked.html");
const PAGE_URL: &str = "https://shop.example/blog/post";

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn article_fixture_core_signals() {
    let signals = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    let content = &signals.content;

    assert_eq!(content.title.as_deref(), Some("Foo"));
    assert_eq!(content.headings.h1, vec!["Bar"]);
    assert_eq!(content.headings.h2, vec!["Cedar planters"]);
    assert_eq!(content.canonical.as_deref(), Some("https://shop.example/x"));
    assert_eq!(
        content.description.as_deref(),
        Some("Hand-built garden furniture and planters.")
    );
    assert_eq!(signals.amp_url.as_deref(), Some("https://shop.example/x/amp"));
    assert!(!signals.is_amp);
    assert_eq!(signals.lang.as_deref(), Some("en-GB"));
    assert_eq!(signals.charset.as_deref(), Some("utf-8"));

    let checks = &signals.checks;
    assert!(checks.h1_count.ok);
    assert_eq!(checks.h1_count.count, 1);
    assert_eq!(checks.alt_coverage.percent, 50.0);
    assert_eq!(checks.alt_coverage.total_imgs, 2);
    assert_eq!(checks.alt_coverage.with_alt, 1);
    assert!(!checks.alt_coverage.ok);
    assert!(checks.canonical.ok);
    assert!(checks.viewport_meta.ok);
    assert!(checks.robots_meta_index.ok);
    assert!(checks.indexable.ok);
    assert_eq!(
        content.images_missing_alt[0].src,
        "https://shop.example/img/bench.jpg"
    );
}

#[test]
fn article_fixture_links_and_social() {
    let signals = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    let content = &signals.content;

    let shop_links = content
        .internal_links
        .iter()
        .filter(|l| *l == "https://shop.example/shop")
        .count();
    assert_eq!(shop_links, 1);
    assert_eq!(content.external_links, vec!["https://partner.example/offer"]);
    assert_eq!(content.nofollow_links, vec!["https://partner.example/offer"]);
    assert!(content
        .internal_links
        .iter()
        .any(|l| l.starts_with("mailto:")));

    assert_eq!(content.hreflang.len(), 2);
    assert_eq!(content.hreflang[0].hreflang, "de");
    assert_eq!(content.hreflang[0].href, "https://shop.example/de/x");

    assert!(content.has_open_graph);
    assert_eq!(
        content.open_graph.get("og:title").map(String::as_str),
        Some("Foo on Shop")
    );
    assert!(content.has_twitter_card);
}

#[test]
fn article_fixture_structured_data() {
    let signals = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    let content = &signals.content;

    assert_eq!(content.json_ld.len(), 3);
    assert_eq!(content.sd_types.types, vec!["Article", "Event", "Recipe"]);
    assert_eq!(content.microdata_count, 1);

    let validation = &content.json_ld_validation;
    assert_eq!(validation.summary.total_items, 3);
    assert_eq!(validation.summary.ok_count, 2);
    assert!(validation.summary.has_errors);

    let event = validation
        .items
        .iter()
        .find(|item| item.item_type == "Event")
        .expect("event item");
    assert!(!event.ok);
    assert_eq!(event.missing, vec!["startDate"]);

    let recipe = validation
        .items
        .iter()
        .find(|item| item.item_type.ends_with("Recipe"))
        .expect("recipe item");
    assert!(recipe.ok);
}

#[test]
fn article_fixture_keyword_density() {
    let signals = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    let keywords = &signals.content.keyword_density_top;

    assert_eq!(keywords[0].word, "cedar");
    assert_eq!(keywords[0].count, 4);
    assert_eq!(keywords[1].word, "planters");
    assert_eq!(keywords[1].count, 3);
    assert!(keywords.iter().all(|k| k.word != "ignored" && k.word != "color"));

    let total: f64 = keywords.iter().map(|k| k.percent).sum();
    assert!(total <= 100.0 + 1e-6, "percentages sum to {total}");
}

#[test]
fn response_headers_drive_header_checks() {
    let headers = headers(&[
        ("content-encoding", "br"),
        ("x-robots-tag", "noindex, nofollow"),
    ]);
    let signals = extract(ARTICLE, &headers, PAGE_URL);
    let checks = &signals.checks;

    assert_eq!(checks.compression.value, "Brotli");
    assert!(checks.compression.ok);
    assert!(!checks.x_robots_tag.ok);
    assert!(!checks.x_robots_tag.follow);
    assert!(!checks.indexable.ok);
}

#[test]
fn extraction_is_deterministic() {
    let first = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    let second = extract(ARTICLE, &BTreeMap::new(), PAGE_URL);
    assert_eq!(first, second);
}

#[test]
fn block_page_fixture_is_detected() {
    assert!(looks_like_waf(BLOCKED));
    assert!(!looks_like_waf(ARTICLE));

    let signals = extract(BLOCKED, &BTreeMap::new(), "https://shop.example/");
    assert_eq!(signals.amp_url.as_deref(), Some("https://shop.example/amp"));
}
