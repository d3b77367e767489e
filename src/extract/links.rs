use scraper::Html;
use url::Url;

use super::{attr, dedupe, has_rel, netloc, percent, resolve, select_all};
use crate::report::{HreflangLink, MissingAltImage};

#[derive(Debug, Default)]
pub(super) struct LinkSets {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    pub nofollow: Vec<String>,
}

/// Anchors with a non-empty href, resolved and partitioned by host. Links
/// that resolve to no host at all (`mailto:`, `javascript:`) count as
/// internal.
pub(super) fn extract_links(doc: &Html, base: Option<&Url>) -> LinkSets {
    let page_host = base.map(|b| netloc(b.as_str())).unwrap_or_default();
    let mut sets = LinkSets::default();

    for anchor in select_all(doc, "a[href]") {
        let Some(href) = attr(&anchor, "href") else {
            continue;
        };
        let absolute = resolve(base, href);
        let host = netloc(&absolute);
        if host.is_empty() || host == page_host {
            sets.internal.push(absolute.clone());
        } else {
            sets.external.push(absolute.clone());
        }
        if has_rel(&anchor, "nofollow") {
            sets.nofollow.push(absolute);
        }
    }

    LinkSets {
        internal: dedupe(sets.internal),
        external: dedupe(sets.external),
        nofollow: dedupe(sets.nofollow),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ImageSummary {
    pub total: usize,
    pub with_alt: usize,
    pub missing_alt: Vec<MissingAltImage>,
}

impl ImageSummary {
    /// 100.0 when the page has no images.
    pub fn coverage_percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            percent(self.with_alt, self.total)
        }
    }
}

pub(super) fn extract_images(doc: &Html, base: Option<&Url>) -> ImageSummary {
    let images = select_all(doc, "img");
    let mut with_alt = 0;
    let mut missing_alt = Vec::new();
    for img in &images {
        if attr(img, "alt").is_some() {
            with_alt += 1;
        } else {
            let src = attr(img, "src")
                .map(|src| resolve(base, src))
                .unwrap_or_default();
            missing_alt.push(MissingAltImage { src });
        }
    }
    ImageSummary {
        total: images.len(),
        with_alt,
        missing_alt,
    }
}

pub(super) fn extract_hreflang(doc: &Html, base: Option<&Url>) -> Vec<HreflangLink> {
    select_all(doc, "link[rel][href]")
        .iter()
        .filter(|link| has_rel(link, "alternate"))
        .filter_map(|link| {
            let hreflang = attr(link, "hreflang")?;
            let href = link.value().attr("href")?.trim();
            Some(HreflangLink {
                hreflang: hreflang.to_string(),
                href: resolve(base, href),
            })
        })
        .collect()
}
