//! Side-by-side comparison of a page and its AMP alternate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::report::ScanResult;

pub const COMPARE_TTL: Duration = Duration::from_secs(15 * 60);

const MISSING: &str = "—";
const NO_AMP_MESSAGE: &str = "No AMP version found via <link rel='amphtml'>.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompareRow {
    pub label: String,
    pub non_amp: String,
    pub amp: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AmpComparison {
    pub url: String,
    pub amp_url: Option<String>,
    pub rows: Vec<CompareRow>,
    pub error: Option<String>,
}

impl AmpComparison {
    /// The page advertises no `rel=amphtml` alternate.
    pub fn without_amp(url: &str) -> Self {
        Self {
            url: url.to_string(),
            amp_url: None,
            rows: Vec::new(),
            error: Some(NO_AMP_MESSAGE.to_string()),
        }
    }

    pub fn from_results(url: &str, amp_url: &str, base: &ScanResult, amp: &ScanResult) -> Self {
        Self {
            url: url.to_string(),
            amp_url: Some(amp_url.to_string()),
            rows: compare_rows(base, amp),
            error: None,
        }
    }
}

fn text_row(label: &str, base: Option<&str>, amp: Option<&str>) -> CompareRow {
    let base = base.filter(|v| !v.is_empty());
    let amp = amp.filter(|v| !v.is_empty());
    CompareRow {
        label: label.to_string(),
        non_amp: base.unwrap_or(MISSING).to_string(),
        amp: amp.unwrap_or(MISSING).to_string(),
        changed: base != amp,
    }
}

fn flag_row(label: &str, base: bool, amp: bool) -> CompareRow {
    let yes_no = |b: bool| if b { "Yes" } else { "No" }.to_string();
    CompareRow {
        label: label.to_string(),
        non_amp: yes_no(base),
        amp: yes_no(amp),
        changed: base != amp,
    }
}

pub fn compare_rows(base: &ScanResult, amp: &ScanResult) -> Vec<CompareRow> {
    let (b, a) = (base.content(), amp.content());
    let h1_count = |r: &ScanResult| r.content().headings.h1.len();
    vec![
        text_row("Title", b.title.as_deref(), a.title.as_deref()),
        text_row("Meta Description", b.description.as_deref(), a.description.as_deref()),
        text_row("Canonical", b.canonical.as_deref(), a.canonical.as_deref()),
        text_row("Robots Meta", b.robots_meta.as_deref(), a.robots_meta.as_deref()),
        CompareRow {
            label: "H1 Count".to_string(),
            non_amp: h1_count(base).to_string(),
            amp: h1_count(amp).to_string(),
            changed: h1_count(base) != h1_count(amp),
        },
        text_row(
            "First H1",
            b.headings.h1.first().map(String::as_str),
            a.headings.h1.first().map(String::as_str),
        ),
        flag_row("Open Graph present", b.has_open_graph, a.has_open_graph),
        flag_row("Twitter Card present", b.has_twitter_card, a.has_twitter_card),
    ]
}

/// Comparison payloads keyed by URL, valid for a fixed TTL.
#[derive(Debug)]
pub struct CompareCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, AmpComparison)>>,
}

impl Default for CompareCache {
    fn default() -> Self {
        Self::new(COMPARE_TTL)
    }
}

impl CompareCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<AmpComparison> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let (stored, payload) = entries.get(url)?;
        (stored.elapsed() <= self.ttl).then(|| payload.clone())
    }

    pub fn put(&self, url: &str, payload: AmpComparison) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (stored, _)| stored.elapsed() <= self.ttl);
        entries.insert(url.to_string(), (Instant::now(), payload));
    }
}
