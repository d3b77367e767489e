//! Single-navigation rendering on top of the pool.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use super::backend::{BrowserBackend, ContextProfile, Navigation, PageDriver};
use super::pool::{BrowserPool, RenderSession};
use crate::error::Degradation;
use crate::wait_mode::WaitMode;
use crate::{Result, ScanError};

const LAZY_LOAD_STEPS: usize = 3;
const LAZY_LOAD_SCROLL_PX: i64 = 1200;
const LAZY_LOAD_PAUSE: Duration = Duration::from_millis(200);

pub const MAIN_CONTENT_SELECTOR: &str = "main, article, #content, .content";
const MAIN_CONTENT_WAIT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    pub wait_until: WaitMode,
    pub settle_delay: Duration,
    pub timeout: Duration,
    pub profile: ContextProfile,
    /// Directory for a full-page screenshot; `None` skips the capture.
    pub screenshot_dir: Option<PathBuf>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_until: WaitMode::default(),
            settle_delay: Duration::from_millis(800),
            timeout: Duration::from_secs(12),
            profile: ContextProfile::default(),
            screenshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    pub status: Option<u16>,
    pub final_url: String,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub html: String,
    pub console_logs: Vec<String>,
    pub elapsed: Duration,
    pub screenshot_path: Option<PathBuf>,
    /// Steps that failed without aborting the render.
    pub degradations: Vec<Degradation>,
}

impl RenderResult {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Render `request.url` in a pooled context.
///
/// Fails with [`ScanError::Navigation`] only when both the requested wait
/// mode and the `networkidle` retry time out or error, or the document
/// cannot be read back.
pub async fn render<B: BrowserBackend>(
    pool: &BrowserPool<B>,
    request: &RenderRequest,
) -> Result<RenderResult> {
    let started = Instant::now();
    debug!(url = %request.url, wait = %request.wait_until, "render requested");
    pool.with_page(&request.profile, |session| {
        drive(session, request, started)
    })
    .await
}

async fn drive<P: PageDriver>(
    session: RenderSession<P>,
    request: &RenderRequest,
    started: Instant,
) -> Result<RenderResult> {
    let page = session.page.as_ref();
    let url = request.url.as_str();

    let navigation =
        navigate_with_retry(page, url, request.wait_until, request.timeout).await?;

    nudge_lazy_content(page).await;
    if !request.settle_delay.is_zero() {
        sleep(request.settle_delay).await;
    }
    wait_for_main_content(page).await;

    let html = page
        .content()
        .await
        .map_err(|e| ScanError::navigation(url, format!("document unreadable: {}", failure_message(&e))))?;
    let final_url = match page.current_url().await {
        Ok(Some(found)) if !found.is_empty() => found,
        _ => url.to_string(),
    };

    let mut degradations = Vec::new();
    let headers = match page.response_headers().await {
        Ok(raw) => lowercase_headers(raw),
        Err(err) => {
            debug!(url, error = %err, "response headers unavailable");
            degradations.push(Degradation::extraction("response headers", failure_message(&err)));
            BTreeMap::new()
        }
    };

    let screenshot_path = match &request.screenshot_dir {
        Some(dir) => match capture_screenshot(page, dir, &final_url).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(url, error = %err, "screenshot failed");
                degradations.push(Degradation::extraction("screenshot", failure_message(&err)));
                None
            }
        },
        None => None,
    };

    Ok(RenderResult {
        status: navigation.status,
        final_url,
        headers,
        html,
        console_logs: session.console.snapshot(),
        elapsed: started.elapsed(),
        screenshot_path,
        degradations,
    })
}

async fn navigate_with_retry<P: PageDriver>(
    page: &P,
    url: &str,
    wait: WaitMode,
    limit: Duration,
) -> Result<Navigation> {
    let first = match navigate_once(page, url, wait, limit).await {
        Ok(nav) => return Ok(nav),
        Err(err) => err,
    };
    warn!(url, wait = %wait, error = %first, "navigation failed, retrying with networkidle");
    navigate_once(page, url, WaitMode::NetworkIdle, limit)
        .await
        .map_err(|retry| {
            ScanError::navigation(
                url,
                format!(
                    "{} (retry with networkidle: {})",
                    failure_message(&first),
                    failure_message(&retry)
                ),
            )
        })
}

async fn navigate_once<P: PageDriver>(
    page: &P,
    url: &str,
    wait: WaitMode,
    limit: Duration,
) -> Result<Navigation> {
    match timeout(limit, page.navigate(url, wait)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ScanError::navigation(
            url,
            format!("timed out after {}ms waiting for {}", limit.as_millis(), wait),
        )),
    }
}

async fn nudge_lazy_content<P: PageDriver>(page: &P) {
    for _ in 0..LAZY_LOAD_STEPS {
        if let Err(err) = page.scroll_by(LAZY_LOAD_SCROLL_PX).await {
            debug!(error = %err, "scroll step failed");
        }
        sleep(LAZY_LOAD_PAUSE).await;
    }
}

async fn wait_for_main_content<P: PageDriver>(page: &P) {
    let found = timeout(
        MAIN_CONTENT_WAIT,
        page.wait_for_selector(MAIN_CONTENT_SELECTOR, MAIN_CONTENT_WAIT),
    )
    .await;
    if !matches!(found, Ok(Ok(true))) {
        debug!("no main content container");
    }
}

async fn capture_screenshot<P: PageDriver>(page: &P, dir: &Path, final_url: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(screenshot_file_name(final_url));
    page.screenshot(&path).await?;
    Ok(path)
}

/// Stable file name derived from a hash of the final URL.
pub fn screenshot_file_name(final_url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    final_url.hash(&mut hasher);
    format!("seoscan-{:016x}.png", hasher.finish())
}

fn lowercase_headers(raw: HashMap<String, String>) -> BTreeMap<String, String> {
    raw.into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}

fn failure_message(err: &ScanError) -> String {
    match err {
        ScanError::Navigation { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
