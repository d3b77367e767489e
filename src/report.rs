//! The scan report.
//!
//! Every field is always serialized (absent values become `null` or empty
//! collections) so consumers never branch on missing keys.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Degradation;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
}

impl Headings {
    pub fn level_mut(&mut self, level: u8) -> Option<&mut Vec<String>> {
        match level {
            1 => Some(&mut self.h1),
            2 => Some(&mut self.h2),
            3 => Some(&mut self.h3),
            4 => Some(&mut self.h4),
            5 => Some(&mut self.h5),
            6 => Some(&mut self.h6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingAltImage {
    pub src: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HreflangLink {
    pub hreflang: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordStat {
    pub word: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredDataTypes {
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonLdItemReport {
    #[serde(rename = "type")]
    pub item_type: String,
    pub missing: Vec<String>,
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JsonLdSummary {
    pub total_items: usize,
    pub ok_count: usize,
    pub has_errors: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JsonLdValidation {
    pub summary: JsonLdSummary,
    pub items: Vec<JsonLdItemReport>,
}

/// Content signals. This is the block that the AMP fallback replaces
/// wholesale when the canonical page was blocked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentSignals {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub robots_meta: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
    pub has_open_graph: bool,
    pub has_twitter_card: bool,
    pub headings: Headings,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
    pub nofollow_links: Vec<String>,
    pub images_missing_alt: Vec<MissingAltImage>,
    pub hreflang: Vec<HreflangLink>,
    pub json_ld: Vec<Value>,
    pub microdata_count: usize,
    pub rdfa_count: usize,
    pub sd_types: StructuredDataTypes,
    pub json_ld_validation: JsonLdValidation,
    pub keyword_density_top: Vec<KeywordStat>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceCheck {
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewportCheck {
    pub present: bool,
    pub value: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountCheck {
    pub count: usize,
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AltCoverage {
    pub ok: bool,
    pub percent: f64,
    pub total_imgs: usize,
    pub with_alt: usize,
}

impl Default for AltCoverage {
    fn default() -> Self {
        Self {
            ok: true,
            percent: 100.0,
            total_imgs: 0,
            with_alt: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueCheck {
    pub value: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct XRobotsCheck {
    pub raw: String,
    pub ok: bool,
    pub follow: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Checks {
    pub canonical: PresenceCheck,
    pub viewport_meta: ViewportCheck,
    pub h1_count: CountCheck,
    pub alt_coverage: AltCoverage,
    pub robots_meta_index: ValueCheck,
    pub robots_meta_follow: ValueCheck,
    pub x_robots_tag: XRobotsCheck,
    pub lang: ValueCheck,
    pub charset: ValueCheck,
    pub compression: ValueCheck,
    pub indexable: ValueCheck,
}

/// Everything the DOM extractor derives from one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSignals {
    pub url: String,
    #[serde(flatten)]
    pub content: ContentSignals,
    pub lang: Option<String>,
    pub charset: Option<String>,
    pub is_amp: bool,
    pub amp_url: Option<String>,
    pub checks: Checks,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpsInfo {
    pub is_https: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    pub load_time_ms: u64,
    pub page_size_bytes: u64,
    pub final_url: String,
    pub https: HttpsInfo,
    pub mobile_score: Option<u32>,
    pub desktop_score: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SitemapRef {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlChecks {
    pub robots_url: Option<String>,
    pub blocked_by_robots: Option<bool>,
    pub sitemaps: Vec<SitemapRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkStatus {
    pub url: String,
    pub final_url: String,
    pub status: Option<u16>,
    pub redirects: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkChecks {
    pub internal: Vec<LinkStatus>,
    pub external: Vec<LinkStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrategyScore {
    pub score: Option<u32>,
    pub metrics: BTreeMap<String, Option<f64>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSpeedReport {
    pub enabled: bool,
    pub message: Option<String>,
    pub mobile: Option<StrategyScore>,
    pub desktop: Option<StrategyScore>,
}

impl PageSpeedReport {
    pub fn disabled(message: impl Into<String>) -> Self {
        Self {
            enabled: false,
            message: Some(message.into()),
            mobile: None,
            desktop: None,
        }
    }
}

/// The full per-scan report. Assembled once by the scanner and never mutated
/// after it is returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanResult {
    #[serde(flatten)]
    pub signals: PageSignals,
    pub status_code: u16,
    pub load_time_ms: u64,
    pub content_length: u64,
    pub performance: PerformanceSummary,
    pub crawl_checks: CrawlChecks,
    pub link_checks: LinkChecks,
    pub pagespeed: PageSpeedReport,
    pub console_logs: Vec<String>,
    pub screenshot_path: Option<PathBuf>,
    pub notes: Vec<String>,
    pub errors: Vec<String>,
}

impl ScanResult {
    /// An empty report for `url` with every section at its absent sentinel.
    pub fn empty(url: &str) -> Self {
        Self {
            signals: PageSignals {
                url: url.to_string(),
                ..PageSignals::default()
            },
            performance: PerformanceSummary {
                final_url: url.to_string(),
                https: HttpsInfo {
                    is_https: url.starts_with("https://"),
                },
                ..PerformanceSummary::default()
            },
            pagespeed: PageSpeedReport::disabled("not run"),
            ..Self::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.signals.url
    }

    pub fn content(&self) -> &ContentSignals {
        &self.signals.content
    }

    pub fn checks(&self) -> &Checks {
        &self.signals.checks
    }

    pub fn record(&mut self, issue: Degradation) {
        if issue.is_error() {
            self.errors.push(issue.to_string());
        } else {
            self.notes.push(issue.to_string());
        }
    }
}
