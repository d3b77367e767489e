//! Google PageSpeed Insights lookup.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::report::{PageSpeedReport, StrategyScore};
use crate::{Result, ScanError};

pub const PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lighthouse audit id and the label it is reported under.
const METRICS: &[(&str, &str)] = &[
    ("first-contentful-paint", "FCP"),
    ("largest-contentful-paint", "LCP"),
    ("cumulative-layout-shift", "CLS"),
    ("total-blocking-time", "TBT"),
    ("interactive", "TTI"),
    ("speed-index", "Speed Index"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct PsiResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Categories,
    #[serde(default)]
    audits: HashMap<String, Audit>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Category,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Audit {
    #[serde(rename = "numericValue")]
    numeric_value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    http: Client,
    api_key: String,
    endpoint: Url,
}

impl PageSpeedClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint_and_timeout(api_key, PAGESPEED_ENDPOINT, DEFAULT_TIMEOUT)
    }

    pub fn with_endpoint_and_timeout(
        api_key: impl Into<String>,
        endpoint: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScanError::Network)?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint,
        })
    }

    /// Performance score (0-100) and lab metrics for one strategy.
    pub async fn fetch_performance_score(&self, url: &str, strategy: Strategy) -> Result<StrategyScore> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("url", url),
                ("strategy", strategy.as_str()),
                ("key", self.api_key.as_str()),
                ("category", "PERFORMANCE"),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ScanError::Http(format!(
                "PageSpeed returned {} for {strategy}",
                status.as_u16()
            )));
        }
        debug!(url, %strategy, bytes = body.len(), "PageSpeed response received");
        parse_response(&body)
    }

    /// Mobile and desktop lookups; a failing strategy carries its error
    /// instead of failing the report.
    pub async fn report(&self, url: &str) -> PageSpeedReport {
        let (mobile, desktop) = tokio::join!(
            self.fetch_performance_score(url, Strategy::Mobile),
            self.fetch_performance_score(url, Strategy::Desktop),
        );
        PageSpeedReport {
            enabled: true,
            message: None,
            mobile: Some(mobile.unwrap_or_else(failed_strategy)),
            desktop: Some(desktop.unwrap_or_else(failed_strategy)),
        }
    }
}

fn failed_strategy(err: ScanError) -> StrategyScore {
    StrategyScore {
        score: None,
        metrics: BTreeMap::new(),
        error: Some(err.to_string()),
    }
}

/// Parse a `runPagespeed` JSON body.
pub fn parse_response(body: &str) -> Result<StrategyScore> {
    let parsed: PsiResponse = serde_json::from_str(body)
        .map_err(|e| ScanError::Http(format!("PageSpeed parse failed: {e}")))?;
    let lighthouse = parsed.lighthouse_result;
    let score = lighthouse.categories.performance.score.unwrap_or(0.0);
    let metrics = METRICS
        .iter()
        .map(|(audit, label)| {
            let value = lighthouse.audits.get(*audit).and_then(|a| a.numeric_value);
            (label.to_string(), value)
        })
        .collect();
    Ok(StrategyScore {
        score: Some((score * 100.0).round().clamp(0.0, 100.0) as u32),
        metrics,
        error: None,
    })
}
