//! DOM signal extraction.
//!
//! [`extract`] is pure: it reads only the HTML, the navigation response
//! headers and the page URL, and yields the same [`PageSignals`] for the same
//! input. Every signal is always present; absent DOM features become empty
//! collections or `None`.

mod checks;
mod headings;
mod keywords;
mod links;
mod metadata;
mod structured_data;

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::report::{ContentSignals, PageSignals};

pub use checks::{compression_label, indexable};
pub use keywords::{keyword_density, STOPWORDS};
pub use structured_data::{
    flatten_json_ld, local_type_name, required_fields, structured_types, validate_json_ld, LdValue,
    MAX_GRAPH_DEPTH, MAX_LD_DEPTH,
};

/// Number of keyword density entries reported.
pub const KEYWORD_TOP_N: usize = 10;

/// Parse `html` rendered from `url` into the full signal set.
pub fn extract(html: &str, headers: &BTreeMap<String, String>, url: &str) -> PageSignals {
    let doc = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let meta = metadata::extract(&doc, base.as_ref());
    let headings = headings::extract(&doc);
    let links = links::extract_links(&doc, base.as_ref());
    let images = links::extract_images(&doc, base.as_ref());
    let hreflang = links::extract_hreflang(&doc, base.as_ref());
    let structured = structured_data::extract(&doc);
    let keyword_density_top = keyword_density(&keywords::visible_text(&doc), KEYWORD_TOP_N);

    let checks = checks::evaluate(checks::CheckInputs {
        canonical: meta.canonical.as_deref(),
        viewport: meta.viewport.as_deref(),
        h1_count: headings.h1.len(),
        images: &images,
        robots_meta: meta.robots_meta.as_deref(),
        headers,
        lang: meta.lang.as_deref(),
        charset: meta.charset.as_deref(),
    });

    let content = ContentSignals {
        has_open_graph: !meta.open_graph.is_empty(),
        has_twitter_card: !meta.twitter_card.is_empty(),
        title: meta.title,
        description: meta.description,
        canonical: meta.canonical,
        robots_meta: meta.robots_meta,
        open_graph: meta.open_graph,
        twitter_card: meta.twitter_card,
        headings,
        internal_links: links.internal,
        external_links: links.external,
        nofollow_links: links.nofollow,
        images_missing_alt: images.missing_alt,
        hreflang,
        json_ld: structured.json_ld,
        microdata_count: structured.microdata_count,
        rdfa_count: structured.rdfa_count,
        sd_types: structured.types,
        json_ld_validation: structured.validation,
        keyword_density_top,
    };

    PageSignals {
        url: url.to_string(),
        content,
        lang: meta.lang,
        charset: meta.charset,
        is_amp: meta.is_amp,
        amp_url: meta.amp_url,
        checks,
    }
}

/// All elements matching `css`; an invalid selector matches nothing.
fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Trimmed, non-empty attribute value.
fn attr<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Whether a space-separated `rel` attribute carries `token`.
fn has_rel(el: &ElementRef<'_>, token: &str) -> bool {
    el.value()
        .attr("rel")
        .map(|rel| {
            rel.split_ascii_whitespace()
                .any(|candidate| candidate.eq_ignore_ascii_case(token))
        })
        .unwrap_or(false)
}

/// Resolve `href` against the page; unparseable input is kept verbatim.
fn resolve(base: Option<&Url>, href: &str) -> String {
    match base {
        Some(base) => base
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string()),
        None => Url::parse(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string()),
    }
}

/// Lowercased `host[:port]`, empty when the URL has no host.
fn netloc(url: &str) -> String {
    crate::resource::host_key(url)
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}

/// `100 * part / whole` rounded to two decimals.
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (10_000.0 * part as f64 / whole as f64).round() / 100.0
}
