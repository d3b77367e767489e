use std::collections::BTreeMap;

use super::links::ImageSummary;
use crate::report::{
    AltCoverage, Checks, CountCheck, PresenceCheck, ValueCheck, ViewportCheck, XRobotsCheck,
};

const ALT_COVERAGE_THRESHOLD: f64 = 80.0;

const ENCODINGS: &[(&str, &str)] = &[
    ("br", "Brotli"),
    ("gzip", "gzip"),
    ("deflate", "deflate"),
    ("zstd", "zstd"),
];

pub(super) struct CheckInputs<'a> {
    pub canonical: Option<&'a str>,
    pub viewport: Option<&'a str>,
    pub h1_count: usize,
    pub images: &'a ImageSummary,
    pub robots_meta: Option<&'a str>,
    pub headers: &'a BTreeMap<String, String>,
    pub lang: Option<&'a str>,
    pub charset: Option<&'a str>,
}

pub(super) fn evaluate(input: CheckInputs<'_>) -> Checks {
    let robots = input.robots_meta.unwrap_or_default().to_ascii_lowercase();
    let robots_index = !robots.contains("noindex");
    let robots_follow = !robots.contains("nofollow");

    let x_robots = input
        .headers
        .get("x-robots-tag")
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();
    let x_robots_index = !x_robots.contains("noindex");

    let viewport = input.viewport.unwrap_or_default().to_string();
    let percent = input.images.coverage_percent();
    let compression = input
        .headers
        .get("content-encoding")
        .and_then(|enc| compression_label(enc));

    Checks {
        canonical: PresenceCheck {
            ok: input.canonical.is_some(),
        },
        viewport_meta: ViewportCheck {
            present: !viewport.is_empty(),
            ok: !viewport.is_empty(),
            value: viewport,
        },
        h1_count: CountCheck {
            count: input.h1_count,
            ok: (1..=2).contains(&input.h1_count),
        },
        alt_coverage: AltCoverage {
            ok: percent >= ALT_COVERAGE_THRESHOLD,
            percent,
            total_imgs: input.images.total,
            with_alt: input.images.with_alt,
        },
        robots_meta_index: ValueCheck {
            value: if robots_index { "index" } else { "noindex" }.to_string(),
            ok: robots_index,
        },
        robots_meta_follow: ValueCheck {
            value: if robots_follow { "follow" } else { "nofollow" }.to_string(),
            ok: robots_follow,
        },
        x_robots_tag: XRobotsCheck {
            follow: !x_robots.contains("nofollow"),
            ok: x_robots_index,
            raw: x_robots,
        },
        lang: ValueCheck {
            value: input.lang.unwrap_or_default().to_string(),
            ok: input.lang.is_some(),
        },
        charset: ValueCheck {
            value: input.charset.unwrap_or_default().to_string(),
            ok: input.charset.is_some(),
        },
        compression: ValueCheck {
            value: compression.unwrap_or("none").to_string(),
            ok: compression.is_some(),
        },
        // Provisional; the scanner folds the HTTP status in.
        indexable: indexable_check(robots_index && x_robots_index),
    }
}

/// Friendly label for a `content-encoding` value.
pub fn compression_label(encoding: &str) -> Option<&'static str> {
    let encoding = encoding.to_ascii_lowercase();
    ENCODINGS
        .iter()
        .find(|(token, _)| encoding.contains(token))
        .map(|(_, label)| *label)
}

/// A page is indexable when it is not a 404 and neither the robots meta tag
/// nor the `x-robots-tag` header says `noindex`.
pub fn indexable(status: u16, checks: &Checks) -> ValueCheck {
    indexable_check(status != 404 && checks.robots_meta_index.ok && checks.x_robots_tag.ok)
}

fn indexable_check(ok: bool) -> ValueCheck {
    ValueCheck {
        value: if ok { "Yes" } else { "No" }.to_string(),
        ok,
    }
}
