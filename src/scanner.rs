//! Scan orchestration.
//!
//! A [`Scanner`] owns the browser pool, the WAF cooldown table and the HTTP
//! client used for auxiliary checks. Each call to [`Scanner::scan`] runs
//! render, extraction, the WAF/AMP fallback and the auxiliary checks in
//! order, then hands the finished result to the persistence sink without
//! waiting on it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::auxiliary::{self, check_links, fetch_robots, PageSpeedClient};
use crate::browser::{render, BrowserBackend, BrowserPool, ContextProfile, RenderRequest, RenderResult};
use crate::compare::{AmpComparison, CompareCache};
use crate::config::Config;
use crate::error::Degradation;
use crate::extract::{self, indexable};
use crate::persist::{ScanRecord, ScanSink};
use crate::report::{CrawlChecks, LinkChecks, PageSpeedReport, ScanResult};
use crate::resource::{host_key, robots_url};
use crate::viewport::{DeviceProfile, Viewport};
use crate::waf::{looks_like_waf, WafCooldownTracker};
use crate::wait_mode::WaitMode;
use crate::Result;

const PAGESPEED_DISABLED: &str = "PageSpeed disabled (fast mode or no API key configured)";

/// Per-call overrides; `None` falls back to the scanner's [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Free-form wait token, normalized with [`WaitMode::normalize`].
    pub wait_until: Option<String>,
    pub settle_delay: Option<Duration>,
    pub timeout: Option<Duration>,
    pub device: DeviceProfile,
    pub viewport: Option<Viewport>,
    pub screenshot: bool,
}

pub struct Scanner<B: BrowserBackend> {
    pool: Arc<BrowserPool<B>>,
    cooldown: Arc<WafCooldownTracker>,
    config: Config,
    http: Client,
    pagespeed: Option<PageSpeedClient>,
    sink: Option<Arc<dyn ScanSink>>,
    compare_cache: CompareCache,
}

#[cfg(feature = "cdp")]
impl Scanner<crate::browser::CdpBackend> {
    /// Scanner backed by a local Chromium through the DevTools protocol.
    pub fn with_chromium(config: Config) -> Result<Self> {
        use crate::browser::{CdpBackend, CdpOptions};

        let backend = CdpBackend::new(CdpOptions::from_config(&config));
        let pool = BrowserPool::new(backend, config.effective_concurrency());
        Self::new(Arc::new(pool), config)
    }
}

impl<B: BrowserBackend> Scanner<B> {
    pub fn new(pool: Arc<BrowserPool<B>>, config: Config) -> Result<Self> {
        config.validate()?;
        let http = auxiliary::http_client(&config)?;
        let pagespeed = match (&config.pagespeed_api_key, config.fast_mode) {
            (Some(key), false) if !key.trim().is_empty() => {
                Some(PageSpeedClient::with_endpoint_and_timeout(
                    key.trim(),
                    auxiliary::PAGESPEED_ENDPOINT,
                    config.auxiliary_limits().pagespeed_timeout,
                )?)
            }
            _ => None,
        };
        Ok(Self {
            pool,
            cooldown: Arc::new(WafCooldownTracker::new(config.waf_cooldown)),
            config,
            http,
            pagespeed,
            sink: None,
            compare_cache: CompareCache::default(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ScanSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_pagespeed(mut self, client: Option<PageSpeedClient>) -> Self {
        self.pagespeed = client;
        self
    }

    /// Share a cooldown table with other scanners.
    pub fn with_cooldown(mut self, tracker: Arc<WafCooldownTracker>) -> Self {
        self.cooldown = tracker;
        self
    }

    pub fn pool(&self) -> &Arc<BrowserPool<B>> {
        &self.pool
    }

    pub fn cooldown(&self) -> &WafCooldownTracker {
        &self.cooldown
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the shared browser. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.pool.stop().await;
    }

    fn render_request(&self, url: &str, options: &ScanOptions) -> RenderRequest {
        let wait_until = options
            .wait_until
            .as_deref()
            .map(|token| WaitMode::normalize(token, self.config.wait_until))
            .unwrap_or(self.config.wait_until);
        RenderRequest {
            url: url.to_string(),
            wait_until,
            settle_delay: options.settle_delay.unwrap_or(self.config.settle_delay),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.config.effective_navigation_timeout()),
            profile: ContextProfile::from_config(&self.config, options.device, options.viewport),
            screenshot_dir: options.screenshot.then(|| self.screenshot_dir()),
        }
    }

    fn screenshot_dir(&self) -> PathBuf {
        self.config.screenshot_dir()
    }

    /// Run one full scan of `url`.
    ///
    /// Only a failed navigation of the requested page is an error. Every
    /// later failure is recorded in the result's `errors` or `notes`.
    pub async fn scan(&self, url: &str, options: &ScanOptions) -> Result<ScanResult> {
        let host = host_key(url);
        if let Some(remaining) = self.cooldown.remaining(&host) {
            info!(url, host = %host, remaining_s = remaining.as_secs(), "host in WAF cooldown, skipping render");
            let mut result = ScanResult::empty(url);
            result
                .notes
                .push(format!("Temporarily cooled down for {host} after WAF block."));
            self.persist(&result);
            return Ok(result);
        }

        info!(url, "scan started");
        let request = self.render_request(url, options);
        let page = render(&self.pool, &request).await?;
        let waf_page = looks_like_waf(&page.html);

        let mut result = self.assemble(url, page);
        if waf_page {
            self.amp_fallback(&host, &request, &mut result).await;
        }
        self.run_auxiliary(&mut result).await;

        info!(
            url,
            status = result.status_code,
            load_time_ms = result.load_time_ms,
            errors = result.errors.len(),
            "scan finished"
        );
        self.persist(&result);
        Ok(result)
    }

    fn assemble(&self, url: &str, page: RenderResult) -> ScanResult {
        let signals = extract::extract(&page.html, &page.headers, url);
        let status_code = page.status.unwrap_or(0);
        let load_time_ms = page.elapsed.as_millis() as u64;
        let content_length = page
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(page.html.len() as u64);

        let mut result = ScanResult {
            signals,
            status_code,
            load_time_ms,
            content_length,
            console_logs: page.console_logs,
            screenshot_path: page.screenshot_path,
            ..ScanResult::empty(url)
        };
        result.performance.load_time_ms = load_time_ms;
        result.performance.page_size_bytes = content_length;
        result.performance.https.is_https = page.final_url.starts_with("https://");
        result.performance.final_url = page.final_url;
        result.signals.checks.indexable = indexable(status_code, &result.signals.checks);

        for issue in page.degradations {
            result.record(issue);
        }
        result
    }

    /// Swap in the AMP page's content when the canonical page is a WAF
    /// challenge. Status, timing and checks stay those of the canonical page.
    async fn amp_fallback(&self, host: &str, request: &RenderRequest, result: &mut ScanResult) {
        result.record(Degradation::WafBlocked {
            host: host.to_string(),
        });
        let Some(amp_url) = result.signals.amp_url.clone() else {
            debug!(host, "WAF page without AMP alternate");
            return;
        };

        let amp_request = RenderRequest {
            url: amp_url.clone(),
            screenshot_dir: None,
            ..request.clone()
        };
        match render(&self.pool, &amp_request).await {
            Ok(amp) if !amp.html.trim().is_empty() && !looks_like_waf(&amp.html) => {
                let signals = extract::extract(&amp.html, &amp.headers, &amp_url);
                result.signals.content = signals.content;
                result
                    .notes
                    .push("Canonical blocked by WAF; AMP analyzed instead.".to_string());
            }
            outcome => {
                match outcome {
                    Err(err) => debug!(amp_url = %amp_url, error = %err, "AMP render failed"),
                    Ok(_) => debug!(amp_url = %amp_url, "AMP page empty or blocked"),
                }
                warn!(host, "WAF blocked canonical and AMP, entering cooldown");
                self.cooldown.enter_cooldown(host);
                result
                    .errors
                    .push("WAF/CDN blocked both canonical and AMP.".to_string());
            }
        }
    }

    async fn run_auxiliary(&self, result: &mut ScanResult) {
        let limits = self.config.auxiliary_limits();
        let final_url = Url::parse(&result.performance.final_url)
            .or_else(|_| Url::parse(result.url()));

        let robots = async {
            match &final_url {
                Ok(page) => fetch_robots(&self.http, page, limits.robots_timeout).await,
                Err(err) => Err(err.clone().into()),
            }
        };
        let internal = check_links(
            &self.http,
            &result.signals.content.internal_links,
            limits.link_sample,
            limits.link_timeout,
        );
        let external = check_links(
            &self.http,
            &result.signals.content.external_links,
            limits.link_sample,
            limits.link_timeout,
        );
        let pagespeed = async {
            match &self.pagespeed {
                Some(client) => client.report(&result.performance.final_url).await,
                None => PageSpeedReport::disabled(PAGESPEED_DISABLED),
            }
        };
        let (robots, internal, external, pagespeed) =
            tokio::join!(robots, internal, external, pagespeed);

        result.crawl_checks = match robots {
            Ok(checks) => checks,
            Err(err) => {
                result.record(Degradation::auxiliary("robots.txt", &err));
                CrawlChecks {
                    robots_url: final_url
                        .ok()
                        .and_then(|u| robots_url(&u))
                        .map(|u| u.to_string()),
                    ..CrawlChecks::default()
                }
            }
        };
        result.link_checks = LinkChecks { internal, external };
        result.performance.mobile_score = pagespeed.mobile.as_ref().and_then(|s| s.score);
        result.performance.desktop_score = pagespeed.desktop.as_ref().and_then(|s| s.score);
        result.pagespeed = pagespeed;
    }

    fn persist(&self, result: &ScanResult) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let record = ScanRecord::from_result(result);
        tokio::spawn(async move {
            let url = record.url.clone();
            if let Err(err) = sink.record(record).await {
                warn!(url = %url, error = %err, "failed to persist scan");
            }
        });
    }

    /// Scan `url` and its `rel=amphtml` alternate and compare the headline
    /// signals. Payloads are cached per URL for [`crate::compare::COMPARE_TTL`].
    pub async fn amp_compare(&self, url: &str, options: &ScanOptions) -> Result<AmpComparison> {
        if let Some(cached) = self.compare_cache.get(url) {
            debug!(url, "AMP comparison served from cache");
            return Ok(cached);
        }
        let base = self.scan(url, options).await?;
        let comparison = match base.signals.amp_url.clone() {
            None => AmpComparison::without_amp(url),
            Some(amp_url) => {
                let amp = self.scan(&amp_url, options).await?;
                AmpComparison::from_results(url, &amp_url, &base, &amp)
            }
        };
        self.compare_cache.put(url, comparison.clone());
        Ok(comparison)
    }

    /// Fill the comparison cache for a page that advertised an AMP
    /// alternate, in the background. Returns `None` when there is nothing to
    /// warm. Failures are logged and dropped.
    pub fn warm_compare(
        self: &Arc<Self>,
        result: &ScanResult,
        options: &ScanOptions,
    ) -> Option<JoinHandle<()>> {
        result.signals.amp_url.as_ref()?;
        let url = result.url().to_string();
        if self.compare_cache.get(&url).is_some() {
            return None;
        }
        let scanner = Arc::clone(self);
        let options = options.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = scanner.amp_compare(&url, &options).await {
                debug!(url = %url, error = %err, "compare warm-up failed");
            }
        }))
    }
}
